//! Connecting - parameters submitted, waiting for the backend's verdict

use sparkconn_core::{LogBuffer, SavedConfiguration};

#[derive(Debug)]
pub struct ConnectingPhase {
    configuration: SavedConfiguration,
    logs: LogBuffer,
}

impl Default for ConnectingPhase {
    fn default() -> Self {
        Self::new(sparkconn_core::DEFAULT_LOG_LINES)
    }
}

impl ConnectingPhase {
    pub fn new(log_lines: usize) -> Self {
        Self {
            configuration: SavedConfiguration::default(),
            logs: LogBuffer::new(log_lines),
        }
    }

    /// Start a new attempt with the submitted configuration
    pub fn init(&mut self, configuration: SavedConfiguration) {
        self.configuration = configuration;
        self.logs.clear();
    }

    pub fn configuration(&self) -> &SavedConfiguration {
        &self.configuration
    }

    pub fn log(&mut self, line: impl Into<String>) {
        self.logs.push(line);
    }

    pub fn logs(&self) -> &LogBuffer {
        &self.logs
    }

    pub fn render(&self) -> String {
        let mut out = String::from("Connecting to Spark...");
        for line in self.logs.iter() {
            out.push('\n');
            out.push_str(line);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_clears_previous_attempt_logs() {
        let mut phase = ConnectingPhase::new(10);
        phase.log("attempt one");
        phase.init(SavedConfiguration::default());
        assert!(phase.logs().is_empty());
    }

    #[test]
    fn test_log_is_bounded() {
        let mut phase = ConnectingPhase::new(2);
        phase.log("a");
        phase.log("b");
        phase.log("c");
        assert_eq!(phase.logs().iter().collect::<Vec<_>>(), vec!["b", "c"]);
        assert!(phase.render().ends_with("b\nc"));
    }
}
