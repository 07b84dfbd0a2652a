use serde::{Deserialize, Deserializer};

/// Number of individual GC pauses retained by the source runtime.
pub const PAUSE_RING_LEN: usize = 256;

/// Payload exposed by one monitored process.
///
/// This is the JSON document returned by every configured endpoint.
/// One snapshot is decoded per successful response and dropped as
/// soon as it has been flattened into a measurement.
///
/// DESIGN NOTES:
/// - Every field defaults to zero / empty when absent or `null`.
/// - Unknown fields are ignored, so newer runtimes exposing extra
///   counters keep decoding.
/// - CPU and memory percentages are computed by the source process
///   and passed through as-is.
///
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct RuntimeSnapshot {
    /// Endpoint identifier, forwarded verbatim as the `serial` tag
    #[serde(deserialize_with = "nullable")]
    pub serial: String,

    /// Logical CPUs visible to the process
    #[serde(deserialize_with = "nullable")]
    pub cpu_num: i64,

    /// OS threads
    #[serde(deserialize_with = "nullable")]
    pub thread_num: i64,

    /// Live goroutines (concurrent tasks)
    #[serde(deserialize_with = "nullable")]
    pub goroutine_num: i64,

    /// CPU utilisation, passed through unvalidated
    #[serde(deserialize_with = "nullable")]
    pub cpu_percent: i64,

    /// Memory utilisation, passed through unvalidated
    #[serde(deserialize_with = "nullable")]
    pub mem_percent: i64,

    #[serde(deserialize_with = "nullable")]
    pub memstats: MemStats,
}

/// `null` leaves the zero value, like an absent field.
fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// ------------------------------------------------------------
// Memory statistics
// ------------------------------------------------------------
//
// Field names follow the standard runtime memory statistics
// schema (PascalCase, with upper-case `GC` acronyms).
//
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default, rename_all = "PascalCase")]
pub struct MemStats {
    // General
    #[serde(deserialize_with = "nullable")]
    pub alloc: u64,
    #[serde(deserialize_with = "nullable")]
    pub total_alloc: u64,
    #[serde(deserialize_with = "nullable")]
    pub sys: u64,
    #[serde(deserialize_with = "nullable")]
    pub lookups: u64,
    #[serde(deserialize_with = "nullable")]
    pub mallocs: u64,
    #[serde(deserialize_with = "nullable")]
    pub frees: u64,

    // Heap
    #[serde(deserialize_with = "nullable")]
    pub heap_alloc: u64,
    #[serde(deserialize_with = "nullable")]
    pub heap_sys: u64,
    #[serde(deserialize_with = "nullable")]
    pub heap_idle: u64,
    #[serde(deserialize_with = "nullable")]
    pub heap_inuse: u64,
    #[serde(deserialize_with = "nullable")]
    pub heap_released: u64,
    #[serde(deserialize_with = "nullable")]
    pub heap_objects: u64,

    // Stack and allocator internals
    #[serde(deserialize_with = "nullable")]
    pub stack_inuse: u64,
    #[serde(deserialize_with = "nullable")]
    pub stack_sys: u64,
    #[serde(rename = "MSpanInuse", deserialize_with = "nullable")]
    pub mspan_inuse: u64,
    #[serde(rename = "MSpanSys", deserialize_with = "nullable")]
    pub mspan_sys: u64,
    #[serde(rename = "MCacheInuse", deserialize_with = "nullable")]
    pub mcache_inuse: u64,
    #[serde(rename = "MCacheSys", deserialize_with = "nullable")]
    pub mcache_sys: u64,
    #[serde(deserialize_with = "nullable")]
    pub other_sys: u64,

    // GC
    #[serde(rename = "GCSys", deserialize_with = "nullable")]
    pub gc_sys: u64,
    #[serde(rename = "NextGC", deserialize_with = "nullable")]
    pub next_gc: u64,
    #[serde(rename = "LastGC", deserialize_with = "nullable")]
    pub last_gc: u64,
    #[serde(deserialize_with = "nullable")]
    pub pause_total_ns: u64,
    pub pause_ns: PauseRing,
    #[serde(rename = "NumGC", deserialize_with = "nullable")]
    pub num_gc: u32,
    #[serde(rename = "GCCPUFraction", deserialize_with = "nullable")]
    pub gc_cpu_fraction: f64,
}

/// Circular history of the most recent GC pause durations (ns).
///
/// The runtime writes pause `n` (1-based) into slot
/// `(n - 1) % 256`, so after `num_gc` collections the next write
/// position is `num_gc % 256` and the latest completed pause sits
/// one slot behind it.
///
/// A payload may carry fewer than 256 entries; the tail is
/// zero-filled. Entries past 256 are dropped, `null` entries read
/// as zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PauseRing(Box<[u64; PAUSE_RING_LEN]>);

impl Default for PauseRing {
    fn default() -> Self {
        Self(Box::new([0; PAUSE_RING_LEN]))
    }
}

impl PauseRing {
    /// Builds a ring from the first `PAUSE_RING_LEN` values.
    pub fn from_slice(values: &[u64]) -> Self {
        let len = values.len().min(PAUSE_RING_LEN);
        let mut ring = Self::default();
        ring.0[..len].copy_from_slice(&values[..len]);
        ring
    }

    /// Slot holding the most recently completed pause after
    /// `num_gc` collections.
    ///
    /// `num_gc == 0` resolves to slot 255, which is still zero in a
    /// fresh ring.
    pub fn latest_slot(num_gc: u32) -> usize {
        ((u64::from(num_gc) + PAUSE_RING_LEN as u64 - 1) % PAUSE_RING_LEN as u64) as usize
    }

    pub fn get(&self, slot: usize) -> u64 {
        self.0[slot % PAUSE_RING_LEN]
    }

    /// Duration of the most recent pause.
    pub fn latest(&self, num_gc: u32) -> u64 {
        self.get(Self::latest_slot(num_gc))
    }
}

impl<'de> Deserialize<'de> for PauseRing {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let values: Vec<u64> = Option::<Vec<Option<u64>>>::deserialize(deserializer)?
            .unwrap_or_default()
            .into_iter()
            .map(Option::unwrap_or_default)
            .collect();
        Ok(Self::from_slice(&values))
    }
}
