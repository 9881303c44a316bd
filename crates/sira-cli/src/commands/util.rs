use anyhow::{anyhow, Result};
use rayon::ThreadPoolBuilder;

/// Size the global rayon pool from `auto` or a positive count.
pub fn configure_threads(spec: &str) -> Result<usize> {
    let count = if spec.eq_ignore_ascii_case("auto") {
        num_cpus::get()
    } else {
        match spec.parse::<usize>() {
            Ok(n) if n > 0 => n,
            _ => {
                return Err(anyhow!(
                    "--threads expects 'auto' or a positive integer, got '{spec}'"
                ))
            }
        }
    };
    // build_global fails once a global pool exists
    let _ = ThreadPoolBuilder::new().num_threads(count).build_global();
    Ok(count)
}
