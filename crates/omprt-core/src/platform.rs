//! Processor count probe

cfg_if::cfg_if! {
    if #[cfg(unix)] {
        fn online_procs() -> Option<usize> {
            // Safety: sysconf has no preconditions
            let n = unsafe { libc::sysconf(libc::_SC_NPROCESSORS_ONLN) };
            if n > 0 {
                Some(n as usize)
            } else {
                None
            }
        }
    } else {
        fn online_procs() -> Option<usize> {
            None
        }
    }
}

/// Number of online logical processors, at least 1
pub fn num_procs() -> usize {
    online_procs()
        .or_else(|| std::thread::available_parallelism().map(|n| n.get()).ok())
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_num_procs_positive() {
        assert!(num_procs() >= 1);
    }
}
