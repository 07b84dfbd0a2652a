use crate::schema::{MemStats, RuntimeSnapshot};
use crate::sink::{FieldMap, FieldValue, TagMap};

/// Every field key emitted for one snapshot.
///
/// Downstream schemas rely on this set being total: a key is never
/// missing, absent source values show up as zero.
pub const FIELD_KEYS: [&str; 32] = [
    "cpu.count",
    "cpu.thread",
    "cpu.goroutines",
    "cpu.cgo_calls",
    "cpu.percent",
    "mem.percent",
    "mem.alloc",
    "mem.total",
    "mem.sys",
    "mem.lookups",
    "mem.malloc",
    "mem.frees",
    "mem.heap.alloc",
    "mem.heap.sys",
    "mem.heap.idle",
    "mem.heap.inuse",
    "mem.heap.released",
    "mem.heap.objects",
    "mem.stack.inuse",
    "mem.stack.sys",
    "mem.stack.mspan_inuse",
    "mem.stack.mspan_sys",
    "mem.stack.mcache_inuse",
    "mem.stack.mcache_sys",
    "mem.othersys",
    "mem.gc.sys",
    "mem.gc.next",
    "mem.gc.last",
    "mem.gc.pause_total",
    "mem.gc.pause",
    "mem.gc.count",
    "mem.gc.cpu_fraction",
];

/// Flattened view of one `RuntimeSnapshot`.
///
/// Built by `Fields::from_snapshot`, then split into the field and
/// tag maps handed to the accumulator.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fields {
    pub serial: String,

    // CPU
    pub num_cpu: i64,
    pub num_thread: i64,
    pub num_goroutine: i64,
    pub num_cgo_call: i64,
    pub cpu_percent: i64,
    pub mem_percent: i64,

    // General
    pub alloc: i64,
    pub total_alloc: i64,
    pub sys: i64,
    pub lookups: i64,
    pub mallocs: i64,
    pub frees: i64,

    // Heap
    pub heap_alloc: i64,
    pub heap_sys: i64,
    pub heap_idle: i64,
    pub heap_inuse: i64,
    pub heap_released: i64,
    pub heap_objects: i64,

    // Stack
    pub stack_inuse: i64,
    pub stack_sys: i64,
    pub mspan_inuse: i64,
    pub mspan_sys: i64,
    pub mcache_inuse: i64,
    pub mcache_sys: i64,
    pub other_sys: i64,

    // GC
    pub gc_sys: i64,
    pub next_gc: i64,
    pub last_gc: i64,
    pub pause_total_ns: i64,
    pub pause_ns: i64,
    pub num_gc: i64,
    pub gc_cpu_fraction: f64,
}

/// Unsigned runtime counters are reinterpreted as signed 64-bit,
/// matching how the metrics pipeline stores integer fields.
fn signed(v: u64) -> i64 {
    v as i64
}

impl Fields {
    pub fn from_snapshot(rd: &RuntimeSnapshot) -> Self {
        let mut fields = Fields {
            serial: rd.serial.clone(),
            num_cpu: rd.cpu_num,
            num_thread: rd.thread_num,
            num_goroutine: rd.goroutine_num,
            cpu_percent: rd.cpu_percent,
            mem_percent: rd.mem_percent,
            ..Default::default()
        };

        fields.collect_mem_stats(&rd.memstats);
        fields.collect_gc_stats(&rd.memstats);
        fields
    }

    fn collect_mem_stats(&mut self, m: &MemStats) {
        self.alloc = signed(m.alloc);
        self.total_alloc = signed(m.total_alloc);
        self.sys = signed(m.sys);
        self.lookups = signed(m.lookups);
        self.mallocs = signed(m.mallocs);
        self.frees = signed(m.frees);

        self.heap_alloc = signed(m.heap_alloc);
        self.heap_sys = signed(m.heap_sys);
        self.heap_idle = signed(m.heap_idle);
        self.heap_inuse = signed(m.heap_inuse);
        self.heap_released = signed(m.heap_released);
        self.heap_objects = signed(m.heap_objects);

        self.stack_inuse = signed(m.stack_inuse);
        self.stack_sys = signed(m.stack_sys);
        self.mspan_inuse = signed(m.mspan_inuse);
        self.mspan_sys = signed(m.mspan_sys);
        self.mcache_inuse = signed(m.mcache_inuse);
        self.mcache_sys = signed(m.mcache_sys);

        self.other_sys = signed(m.other_sys);
    }

    fn collect_gc_stats(&mut self, m: &MemStats) {
        self.gc_sys = signed(m.gc_sys);
        self.next_gc = signed(m.next_gc);
        self.last_gc = signed(m.last_gc);
        self.pause_total_ns = signed(m.pause_total_ns);
        self.pause_ns = signed(m.pause_ns.latest(m.num_gc));
        self.num_gc = i64::from(m.num_gc);
        self.gc_cpu_fraction = m.gc_cpu_fraction;
    }

    pub fn tags(&self) -> TagMap {
        TagMap::from([("serial".to_string(), self.serial.clone())])
    }

    pub fn values(&self) -> FieldMap {
        let ints = [
            ("cpu.count", self.num_cpu),
            ("cpu.thread", self.num_thread),
            ("cpu.goroutines", self.num_goroutine),
            ("cpu.cgo_calls", self.num_cgo_call),
            ("cpu.percent", self.cpu_percent),
            ("mem.percent", self.mem_percent),
            ("mem.alloc", self.alloc),
            ("mem.total", self.total_alloc),
            ("mem.sys", self.sys),
            ("mem.lookups", self.lookups),
            ("mem.malloc", self.mallocs),
            ("mem.frees", self.frees),
            ("mem.heap.alloc", self.heap_alloc),
            ("mem.heap.sys", self.heap_sys),
            ("mem.heap.idle", self.heap_idle),
            ("mem.heap.inuse", self.heap_inuse),
            ("mem.heap.released", self.heap_released),
            ("mem.heap.objects", self.heap_objects),
            ("mem.stack.inuse", self.stack_inuse),
            ("mem.stack.sys", self.stack_sys),
            ("mem.stack.mspan_inuse", self.mspan_inuse),
            ("mem.stack.mspan_sys", self.mspan_sys),
            ("mem.stack.mcache_inuse", self.mcache_inuse),
            ("mem.stack.mcache_sys", self.mcache_sys),
            ("mem.othersys", self.other_sys),
            ("mem.gc.sys", self.gc_sys),
            ("mem.gc.next", self.next_gc),
            ("mem.gc.last", self.last_gc),
            ("mem.gc.pause_total", self.pause_total_ns),
            ("mem.gc.pause", self.pause_ns),
            ("mem.gc.count", self.num_gc),
        ];

        let mut out: FieldMap = ints
            .into_iter()
            .map(|(k, v)| (k.to_string(), FieldValue::Int(v)))
            .collect();
        out.insert(
            "mem.gc.cpu_fraction".to_string(),
            FieldValue::Float(self.gc_cpu_fraction),
        );
        out
    }
}

/// Flattens one snapshot into the field and tag maps of a measurement.
pub fn flatten(rd: &RuntimeSnapshot) -> (FieldMap, TagMap) {
    let fields = Fields::from_snapshot(rd);
    (fields.values(), fields.tags())
}
