/// Group numeric digits to facilitate reading long numbers
pub fn group_digits<F: std::fmt::Display>(n: F) -> String {
    use numsep::{separate, Locale};
    separate(n, Locale::English)
}

pub mod timing {

    use super::group_digits;
    use std::time::Instant;
    use tracing::info;

    /// Logs how long each stage of a multi-stage job took
    pub struct Progress {
        previous: Instant,
        stage: String,
    }

    impl Progress {

        #[allow(clippy::new_without_default)]
        pub fn new() -> Self { Self { previous: Instant::now(), stage: String::new() } }

        /// Log message, start timer.
        pub fn start(&mut self, message: &str) {
            info!("{message} ...");
            message.clone_into(&mut self.stage);
            self.start_timer();
        }

        // Log time elapsed since last start or done
        pub fn done(&mut self) {
            info!(stage = %self.stage, "done in {} ms", group_digits(self.previous.elapsed().as_millis()));
            self.start_timer();
        }

        // Log message followed by time elapsed since last start or done
        pub fn done_with_message(&mut self, message: &str) {
            info!("{message}: {} ms", group_digits(self.previous.elapsed().as_millis()));
            self.start_timer();
        }

        fn start_timer(&mut self) { self.previous = Instant::now() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    #[allow(unused)] use pretty_assertions::{assert_eq, assert_ne};

    #[rstest(/**/ n        , grouped,
             case(999      , "999"),
             case(1234567  , "1,234,567"),
    )]
    fn digits(n: u64, grouped: &str) {
        assert_eq!(group_digits(n), grouped);
    }
}
