//! Rayon parallel iterator support for [`HashMap`].

use crate::{DefaultHashBuilder, HashMap};
use rayon::iter::{FromParallelIterator, IntoParallelIterator, ParallelExtend, ParallelIterator};
use std::hash::{BuildHasher, Hash};

impl<K, V, S> ParallelExtend<(K, V)> for &HashMap<K, V, S>
where
    K: 'static + Sync + Send + Clone + Hash + Eq,
    V: 'static + Sync + Send,
    S: BuildHasher + Clone + Sync,
{
    fn par_extend<I>(&mut self, par_iter: I)
    where
        I: IntoParallelIterator<Item = (K, V)>,
    {
        par_iter.into_par_iter().for_each(|(key, value)| {
            // guards cannot cross rayon's thread boundaries, so each item
            // pins its own
            let guard = self.guard();
            self.insert(key, value, &guard);
        });
    }
}

impl<K, V> FromParallelIterator<(K, V)> for HashMap<K, V, DefaultHashBuilder>
where
    K: 'static + Sync + Send + Clone + Hash + Eq,
    V: 'static + Sync + Send,
{
    fn from_par_iter<I>(par_iter: I) -> Self
    where
        I: IntoParallelIterator<Item = (K, V)>,
    {
        let map = Self::new();
        (&map).par_extend(par_iter);
        map
    }
}
