//! Dispatch table for directed commands.
//!
//! A command arrives on a node's own `node/<id>` topic and, when recognized,
//! produces a `(kind, data)` pair that the node publishes on the shared
//! response topic. Unknown commands are ignored by the caller.

const GET_CPU_INFO: &str = "GET_CPU_INFO";

pub fn dispatch(command: &str) -> Option<(&'static str, String)> {
    match command {
        GET_CPU_INFO => Some(("CPU_INFO", cpu_info())),
        _ => None,
    }
}

/// Core count plus one-minute load average, `-1.00` where the platform does
/// not expose a load average.
pub fn cpu_info() -> String {
    format!("CORES:{},LOAD:{}", num_cpus::get(), load_average())
}

fn load_average() -> String {
    std::fs::read_to_string("/proc/loadavg")
        .ok()
        .and_then(|s| s.split_whitespace().next().map(str::to_string))
        .unwrap_or_else(|| "-1.00".to_string())
}
