/*
 * Copyright 2020 UT OVERSEAS INC
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 * https://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 */

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::Ordering as CoreOrdering;

use crate::utils::errors::AtomicsError;

/// Memory ordering requested for an atomic or fence operation.
///
/// Unlike `core::sync::atomic::Ordering`, every mode is accepted by every operation. Modes an
/// operation cannot express are strengthened, never weakened: a `Release` load becomes `SeqCst`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Ordering {
    Relaxed,
    Acquire,
    Release,
    AcqRel,
    SeqCst,
}

impl Ordering {
    pub const ALL: [Ordering; 5] = [
        Ordering::Relaxed,
        Ordering::Acquire,
        Ordering::Release,
        Ordering::AcqRel,
        Ordering::SeqCst,
    ];

    #[inline]
    pub const fn has_acquire(self) -> bool {
        matches!(self, Ordering::Acquire | Ordering::AcqRel | Ordering::SeqCst)
    }

    #[inline]
    pub const fn has_release(self) -> bool {
        matches!(self, Ordering::Release | Ordering::AcqRel | Ordering::SeqCst)
    }

    /// True if `self` gives every guarantee `other` gives.
    #[inline]
    pub const fn is_at_least(self, other: Ordering) -> bool {
        match (self, other) {
            (Ordering::SeqCst, _) => true,
            (_, Ordering::SeqCst) => false,
            _ => (self.has_acquire() || !other.has_acquire()) && (self.has_release() || !other.has_release()),
        }
    }

    /// The weakest mode at least as strong as both.
    #[inline]
    pub const fn join(self, other: Ordering) -> Ordering {
        match (self, other) {
            (Ordering::SeqCst, _) | (_, Ordering::SeqCst) => Ordering::SeqCst,
            _ => match (self.has_acquire() || other.has_acquire(), self.has_release() || other.has_release()) {
                (true, true) => Ordering::AcqRel,
                (true, false) => Ordering::Acquire,
                (false, true) => Ordering::Release,
                (false, false) => Ordering::Relaxed,
            },
        }
    }

    #[inline]
    pub(crate) const fn for_load(self) -> CoreOrdering {
        match self {
            Ordering::Relaxed => CoreOrdering::Relaxed,
            Ordering::Acquire => CoreOrdering::Acquire,
            Ordering::Release | Ordering::AcqRel | Ordering::SeqCst => CoreOrdering::SeqCst,
        }
    }

    #[inline]
    pub(crate) const fn for_store(self) -> CoreOrdering {
        match self {
            Ordering::Relaxed => CoreOrdering::Relaxed,
            Ordering::Release => CoreOrdering::Release,
            Ordering::Acquire | Ordering::AcqRel | Ordering::SeqCst => CoreOrdering::SeqCst,
        }
    }

    #[inline]
    pub(crate) const fn for_rmw(self) -> CoreOrdering {
        match self {
            Ordering::Relaxed => CoreOrdering::Relaxed,
            Ordering::Acquire => CoreOrdering::Acquire,
            Ordering::Release => CoreOrdering::Release,
            Ordering::AcqRel => CoreOrdering::AcqRel,
            Ordering::SeqCst => CoreOrdering::SeqCst,
        }
    }

    /// Ordering of the load performed by a failed compare-and-swap. No store happens on that
    /// path, so only the acquire half of the request applies.
    #[inline]
    pub(crate) const fn for_cas_failure(self) -> CoreOrdering {
        match self {
            Ordering::Relaxed | Ordering::Release => CoreOrdering::Relaxed,
            Ordering::Acquire | Ordering::AcqRel => CoreOrdering::Acquire,
            Ordering::SeqCst => CoreOrdering::SeqCst,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Ordering::Relaxed => "relaxed",
            Ordering::Acquire => "acquire",
            Ordering::Release => "release",
            Ordering::AcqRel => "acq_rel",
            Ordering::SeqCst => "seq_cst",
        }
    }
}

impl Default for Ordering {
    fn default() -> Self {
        Ordering::SeqCst
    }
}

impl fmt::Display for Ordering {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Ordering {
    type Err = AtomicsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        match normalized.as_str() {
            "relaxed" => Ok(Ordering::Relaxed),
            "acquire" => Ok(Ordering::Acquire),
            "release" => Ok(Ordering::Release),
            "acq_rel" | "acquire_release" | "acqrel" => Ok(Ordering::AcqRel),
            "seq_cst" | "seqcst" | "sequentially_consistent" => Ok(Ordering::SeqCst),
            _ => Err(AtomicsError::UnknownOrdering(s.to_string())),
        }
    }
}

impl From<Ordering> for CoreOrdering {
    fn from(ordering: Ordering) -> Self {
        ordering.for_rmw()
    }
}

#[cfg(test)]
mod tests {
    use galvanic_assert::matchers::any_value;
    use galvanic_assert::{assert_that, has_structure, structure};

    use super::*;

    fn core_is_at_least(actual: CoreOrdering, requested: Ordering) -> bool {
        let as_ours = match actual {
            CoreOrdering::Relaxed => Ordering::Relaxed,
            CoreOrdering::Acquire => Ordering::Acquire,
            CoreOrdering::Release => Ordering::Release,
            CoreOrdering::AcqRel => Ordering::AcqRel,
            _ => Ordering::SeqCst,
        };
        as_ours.is_at_least(requested)
    }

    #[test]
    fn that_loads_and_stores_never_weaken() {
        for &o in Ordering::ALL.iter() {
            assert!(core_is_at_least(o.for_load(), o), "load {}", o);
            assert!(core_is_at_least(o.for_store(), o), "store {}", o);
            assert!(core_is_at_least(o.for_rmw(), o), "rmw {}", o);
        }
    }

    #[test]
    fn that_load_and_store_orderings_are_legal_for_core() {
        for &o in Ordering::ALL.iter() {
            assert_ne!(o.for_load(), CoreOrdering::Release);
            assert_ne!(o.for_load(), CoreOrdering::AcqRel);
            assert_ne!(o.for_store(), CoreOrdering::Acquire);
            assert_ne!(o.for_store(), CoreOrdering::AcqRel);
            assert_ne!(o.for_cas_failure(), CoreOrdering::Release);
            assert_ne!(o.for_cas_failure(), CoreOrdering::AcqRel);
        }
    }

    #[test]
    fn test_join() {
        assert_eq!(Ordering::Acquire.join(Ordering::Release), Ordering::AcqRel);
        assert_eq!(Ordering::Relaxed.join(Ordering::Acquire), Ordering::Acquire);
        assert_eq!(Ordering::Relaxed.join(Ordering::Relaxed), Ordering::Relaxed);
        assert_eq!(Ordering::AcqRel.join(Ordering::SeqCst), Ordering::SeqCst);

        for &a in Ordering::ALL.iter() {
            for &b in Ordering::ALL.iter() {
                let j = a.join(b);
                assert!(j.is_at_least(a) && j.is_at_least(b), "{} join {} = {}", a, b, j);
            }
        }
    }

    #[test]
    fn test_is_at_least() {
        assert!(Ordering::SeqCst.is_at_least(Ordering::AcqRel));
        assert!(Ordering::AcqRel.is_at_least(Ordering::Acquire));
        assert!(!Ordering::Acquire.is_at_least(Ordering::Release));
        assert!(!Ordering::Release.is_at_least(Ordering::Acquire));
        assert!(!Ordering::AcqRel.is_at_least(Ordering::SeqCst));
        assert!(Ordering::Relaxed.is_at_least(Ordering::Relaxed));
    }

    #[test]
    fn test_parse() {
        assert_eq!("acquire".parse::<Ordering>().unwrap(), Ordering::Acquire);
        assert_eq!("Acq-Rel".parse::<Ordering>().unwrap(), Ordering::AcqRel);
        assert_eq!(" seq_cst ".parse::<Ordering>().unwrap(), Ordering::SeqCst);
        for &o in Ordering::ALL.iter() {
            assert_eq!(o.to_string().parse::<Ordering>().unwrap(), o);
        }
        assert_that!(
            &"consume".parse::<Ordering>().unwrap_err(),
            has_structure!(AtomicsError::UnknownOrdering[any_value()])
        );
    }
}
