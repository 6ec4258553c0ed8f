//! Construction-time tuning for [`HashMap`](crate::HashMap).

use crate::bucket::BucketKind;

pub const DEFAULT_INITIAL_CAPACITY: usize = 16;
pub const MAXIMUM_CAPACITY: usize = 1 << 30;
pub const DEFAULT_LOAD_FACTOR: f32 = 0.75;

/// A linear bucket holding more than this many entries becomes a tree.
pub const TREEIFY_THRESHOLD: usize = 8;
/// A tree bucket holding fewer than this many entries becomes linear again.
pub const UNTREEIFY_THRESHOLD: usize = 6;
/// Buckets are never treeified while the directory is smaller than this.
pub const MIN_TREEIFY_CAPACITY: usize = 64;

const MIN_LOAD_FACTOR: f32 = 0.001;
const MAX_LOAD_FACTOR: f32 = 1.0;
const CAPACITY_LIMIT: usize = 1 << (usize::BITS - 2);

/// Which structures buckets may use.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub enum Layout {
    /// Linear buckets that turn into trees under collision pressure.
    #[default]
    Adaptive,
    /// Linear buckets only.
    LinearOnly,
    /// Tree buckets only.
    TreeOnly,
}

/// The list structure linear buckets use.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub enum LinearKind {
    #[default]
    Chain,
    List,
}

impl From<LinearKind> for BucketKind {
    fn from(k: LinearKind) -> Self {
        match k {
            LinearKind::Chain => BucketKind::Chain,
            LinearKind::List => BucketKind::List,
        }
    }
}

/// Map configuration. Out-of-range values are corrected when the map is
/// built rather than rejected.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Config {
    pub capacity_init: usize,
    pub capacity_max: usize,
    pub load_factor: f32,
    pub layout: Layout,
    pub linear: LinearKind,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            capacity_init: DEFAULT_INITIAL_CAPACITY,
            capacity_max: MAXIMUM_CAPACITY,
            load_factor: DEFAULT_LOAD_FACTOR,
            layout: Layout::Adaptive,
            linear: LinearKind::Chain,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn capacity_init(mut self, n: usize) -> Self {
        self.capacity_init = n;
        self
    }

    pub fn capacity_max(mut self, n: usize) -> Self {
        self.capacity_max = n;
        self
    }

    pub fn load_factor(mut self, f: f32) -> Self {
        self.load_factor = f;
        self
    }

    pub fn layout(mut self, layout: Layout) -> Self {
        self.layout = layout;
        self
    }

    pub fn linear(mut self, linear: LinearKind) -> Self {
        self.linear = linear;
        self
    }

    /// Kind given to freshly created buckets.
    pub(crate) fn base_kind(&self) -> BucketKind {
        match self.layout {
            Layout::TreeOnly => BucketKind::Tree,
            Layout::Adaptive | Layout::LinearOnly => self.linear.into(),
        }
    }

    pub(crate) fn adaptive(&self) -> bool {
        self.layout == Layout::Adaptive
    }

    /// Power-of-two capacities, an initial capacity within the maximum and
    /// a usable load factor.
    pub(crate) fn normalized(self) -> Self {
        let capacity_max = match self.capacity_max {
            0 => MAXIMUM_CAPACITY,
            n => round_capacity(n),
        };
        let capacity_init = match self.capacity_init {
            0 => DEFAULT_INITIAL_CAPACITY.min(capacity_max),
            n if n >= capacity_max => capacity_max,
            n => round_capacity(n),
        };
        let load_factor = if (MIN_LOAD_FACTOR..=MAX_LOAD_FACTOR).contains(&self.load_factor) {
            self.load_factor
        } else {
            DEFAULT_LOAD_FACTOR
        };
        let fixed = Self {
            capacity_init,
            capacity_max,
            load_factor,
            ..self
        };
        if fixed != self {
            tracing::debug!(
                requested = ?self,
                capacity_init,
                capacity_max,
                load_factor,
                "map configuration corrected"
            );
        }
        fixed
    }
}

/// Smallest power of two not below `n`.
fn round_capacity(n: usize) -> usize {
    n.checked_next_power_of_two()
        .unwrap_or(CAPACITY_LIMIT)
        .min(CAPACITY_LIMIT)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Invariant: defaults match the documented constants and survive normalisation.
    #[test]
    fn defaults_are_stable() {
        let c = Config::default();
        assert_eq!(c.normalized(), c);
        assert_eq!(c.capacity_init, 16);
        assert_eq!(c.capacity_max, 1 << 30);
        assert_eq!(c.base_kind(), BucketKind::Chain);
        assert!(c.adaptive());
    }

    /// Invariant: capacities are rounded up to powers of two and the initial
    /// capacity never exceeds the maximum.
    #[test]
    fn capacities_are_rounded_and_clamped() {
        let c = Config::new().capacity_init(5).capacity_max(100).normalized();
        assert_eq!((c.capacity_init, c.capacity_max), (8, 128));

        let c = Config::new().capacity_init(500).capacity_max(100).normalized();
        assert_eq!(c.capacity_init, 128);

        let c = Config::new().capacity_init(0).capacity_max(0).normalized();
        assert_eq!((c.capacity_init, c.capacity_max), (16, MAXIMUM_CAPACITY));

        let c = Config::new().capacity_init(0).capacity_max(4).normalized();
        assert_eq!(c.capacity_init, 4);

        assert_eq!(round_capacity(1), 1);
        assert_eq!(round_capacity(64), 64);
        assert_eq!(round_capacity(usize::MAX), CAPACITY_LIMIT);
    }

    /// Invariant: load factors outside [0.001, 1.0], including NaN, fall back to 0.75.
    #[test]
    fn load_factor_falls_back() {
        for bad in [0.0, -1.0, 1.5, f32::NAN, 0.0001] {
            assert_eq!(Config::new().load_factor(bad).normalized().load_factor, DEFAULT_LOAD_FACTOR);
        }
        assert_eq!(Config::new().load_factor(0.5).normalized().load_factor, 0.5);
        assert_eq!(Config::new().load_factor(1.0).normalized().load_factor, 1.0);
    }

    /// Invariant: layouts pick the base bucket kind.
    #[test]
    fn layout_selects_base_kind() {
        assert_eq!(Config::new().layout(Layout::TreeOnly).base_kind(), BucketKind::Tree);
        assert_eq!(
            Config::new().layout(Layout::LinearOnly).linear(LinearKind::List).base_kind(),
            BucketKind::List
        );
        assert!(!Config::new().layout(Layout::LinearOnly).adaptive());
    }
}
