//! ConnectFailed - the backend could not start the Spark session

use super::ActionSignal;

#[derive(Debug, Default)]
pub struct ConnectFailedPhase {
    error: String,
    /// Fired when the user asks to try again with new parameters
    pub reconfigure: ActionSignal<()>,
}

impl ConnectFailedPhase {
    pub fn init(&mut self, error: impl Into<String>) {
        self.error = error.into();
        self.reconfigure.arm();
    }

    pub fn error(&self) -> &str {
        &self.error
    }

    pub fn render(&self) -> String {
        if self.error.is_empty() {
            "Connection failed".to_string()
        } else {
            format!("Connection failed: {}", self.error)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_sets_error_and_arms() {
        let mut phase = ConnectFailedPhase::default();
        phase.init("timeout");
        assert_eq!(phase.error(), "timeout");
        assert_eq!(phase.render(), "Connection failed: timeout");
        assert!(phase.reconfigure.is_armed());
    }
}
