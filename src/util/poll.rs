use std::future::Future;

use tokio::runtime::{Builder, Runtime};

/// Drives SDK futures to completion from synchronous callers.
///
/// Must not be used from inside another tokio runtime; `block_on` panics there.
pub struct Poller {
    runtime: Runtime,
}

impl Poller {
    pub fn new() -> std::io::Result<Self> {
        let runtime = Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("ossfs-io")
            .enable_all()
            .build()?;

        Ok(Self { runtime })
    }

    pub fn poll_until_ready<Fut>(&self, future: Fut) -> Fut::Output
    where
        Fut: Future,
    {
        self.runtime.block_on(future)
    }

    pub fn poll_until_ready_error<Fut, T, E>(&self, future: Fut) -> Result<T, E>
    where
        Fut: Future<Output = Result<T, E>>,
    {
        self.poll_until_ready(future)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_poll_until_ready() {
        let poller = Poller::new().unwrap();

        let result = poller.poll_until_ready(async {
            tokio::time::sleep(Duration::from_millis(5)).await;
            42
        });
        assert_eq!(result, 42);

        let result: Result<(), String> =
            poller.poll_until_ready_error(async { Err("failed".to_string()) });
        assert_eq!(result, Err("failed".to_string()));
    }
}
