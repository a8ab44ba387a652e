/// Returns the number of logical CPU cores available on the system.
///
/// Platform-specific core-counting APIs (Windows `GetSystemInfo`, macOS
/// `sysctlbyname`, Linux `sysconf`, BSD `sysctlbyname kern.smp.*`) all
/// collapse to `std::thread::available_parallelism`, which this wraps.
///
/// Guaranteed to return a value >= 1 (falls back to 1 on error).
pub fn count_cores() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_cores_at_least_one() {
        assert!(count_cores() >= 1);
    }
}
