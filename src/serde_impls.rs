//! Provides [`Serialize`] and [`Deserialize`] implementations for
//! [`HashMap`] and [`HashMapRef`].

use crate::{HashMap, HashMapRef};
use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::{self, Formatter};
use std::hash::{BuildHasher, Hash};
use std::marker::PhantomData;

impl<K, V, S> Serialize for HashMap<K, V, S>
where
    K: Serialize + Hash + Eq,
    V: Serialize,
    S: BuildHasher,
{
    fn serialize<Sr>(&self, serializer: Sr) -> Result<Sr::Ok, Sr::Error>
    where
        Sr: Serializer,
    {
        self.pin().serialize(serializer)
    }
}

impl<K, V, S> Serialize for HashMapRef<'_, K, V, S>
where
    K: Serialize + Hash + Eq,
    V: Serialize,
    S: BuildHasher,
{
    fn serialize<Sr>(&self, serializer: Sr) -> Result<Sr::Ok, Sr::Error>
    where
        Sr: Serializer,
    {
        serializer.collect_map(self.iter())
    }
}

impl<'de, K, V, S> Deserialize<'de> for HashMap<K, V, S>
where
    K: 'static + Deserialize<'de> + Sync + Send + Clone + Hash + Eq,
    V: 'static + Deserialize<'de> + Sync + Send,
    S: Default + BuildHasher + Clone,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_map(HashMapVisitor::default())
    }
}

struct HashMapVisitor<K, V, S> {
    _marker: PhantomData<fn() -> HashMap<K, V, S>>,
}

impl<K, V, S> Default for HashMapVisitor<K, V, S> {
    fn default() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<'de, K, V, S> Visitor<'de> for HashMapVisitor<K, V, S>
where
    K: 'static + Deserialize<'de> + Sync + Send + Clone + Hash + Eq,
    V: 'static + Deserialize<'de> + Sync + Send,
    S: Default + BuildHasher + Clone,
{
    type Value = HashMap<K, V, S>;

    fn expecting(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        write!(formatter, "a map")
    }

    fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let map = HashMap::with_hasher(S::default());
        {
            let guard = map.guard();
            while let Some((key, value)) = access.next_entry()? {
                map.insert(key, value, &guard);
            }
        }
        Ok(map)
    }
}
