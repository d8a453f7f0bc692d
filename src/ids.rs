//! Process-wide identifiers.
//!
//! Every entity kind draws from its own ascending atomic counter. Ids are opaque: they are only
//! compared for equality and ordering, never parsed.

use serde::{Deserialize, Serialize};
use std::{
    fmt,
    sync::atomic::{AtomicU32, Ordering},
};

macro_rules! define_id {
    ($name:ident, $counter:ident, $prefix:literal) => {
        static $counter: AtomicU32 = AtomicU32::new(0);

        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(u32);

        impl $name {
            /// Take the next unused id of this kind.
            pub fn next() -> Self {
                Self($counter.fetch_add(1, Ordering::Relaxed))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }
    };
}

define_id!(PersonId, NEXT_PERSON_ID, "person#");
define_id!(PlaceId, NEXT_PLACE_ID, "place#");
define_id!(DiseaseId, NEXT_DISEASE_ID, "disease#");

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn ids_are_unique_across_threads() {
        let ids: Vec<PersonId> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..4)
                .map(|_| s.spawn(|| (0..1000).map(|_| PersonId::next()).collect::<Vec<_>>()))
                .collect();
            handles
                .into_iter()
                .flat_map(|h| h.join().expect("thread panicked"))
                .collect()
        });
        let unique: HashSet<_> = ids.iter().collect();
        assert_eq!(unique.len(), ids.len());
    }

    #[test]
    fn kinds_count_independently() {
        let a = PlaceId::next();
        let b = PlaceId::next();
        assert!(b > a);
        assert_eq!(format!("{}", DiseaseId(7)), "disease#7");
    }
}
