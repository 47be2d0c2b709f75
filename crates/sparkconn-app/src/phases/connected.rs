//! Connected - the backend reports an active Spark session

use sparkconn_core::prelude::*;
use sparkconn_core::{ConnectedInfo, LogBuffer};

use super::ActionSignal;

#[derive(Debug)]
pub struct ConnectedPhase {
    /// Raw history server location as sent by the backend
    history_server: Option<String>,
    history_url: Option<url::Url>,
    logs: LogBuffer,
    /// Fired when the user asks to change the connection parameters
    pub reconfigure: ActionSignal<()>,
}

impl Default for ConnectedPhase {
    fn default() -> Self {
        Self::new(sparkconn_core::DEFAULT_LOG_LINES)
    }
}

impl ConnectedPhase {
    pub fn new(log_lines: usize) -> Self {
        Self {
            history_server: None,
            history_url: None,
            logs: LogBuffer::new(log_lines),
            reconfigure: ActionSignal::default(),
        }
    }

    pub fn init(&mut self, info: &ConnectedInfo) {
        self.history_server = info.config.sparkhistoryserver.clone();
        self.history_url = info.history_server_url();
        if self.history_url.is_none() {
            if let Some(raw) = &self.history_server {
                warn!("History server location is not a valid URL: {}", raw);
            }
        }
        self.logs.clear();
        self.reconfigure.arm();
    }

    pub fn history_server(&self) -> Option<&str> {
        self.history_server.as_deref()
    }

    /// Parsed history server location, if valid
    pub fn history_url(&self) -> Option<&url::Url> {
        self.history_url.as_ref()
    }

    pub fn log(&mut self, line: impl Into<String>) {
        self.logs.push(line);
    }

    pub fn logs(&self) -> &LogBuffer {
        &self.logs
    }

    pub fn render(&self) -> String {
        let mut out = String::from("Connected to Spark");
        if let Some(history) = &self.history_server {
            out.push_str(&format!("\n  history server: {}", history));
        }
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
    use sparkconn_core::ConnectedConfig;

    fn info(history: Option<&str>) -> ConnectedInfo {
        ConnectedInfo {
            config: ConnectedConfig {
                sparkhistoryserver: history.map(str::to_string),
            },
        }
    }

    #[test]
    fn test_init_records_history_server() {
        let mut phase = ConnectedPhase::new(10);
        phase.init(&info(Some("http://h")));

        assert_eq!(phase.history_server(), Some("http://h"));
        assert_eq!(phase.history_url().map(|u| u.host_str()), Some(Some("h")));
        assert!(phase.reconfigure.is_armed());
    }

    #[test]
    fn test_invalid_history_server_kept_as_text() {
        let mut phase = ConnectedPhase::new(10);
        phase.init(&info(Some("not a url")));

        assert!(phase.render().contains("history server: not a url"));
        assert!(phase.history_url().is_none());
    }

    #[test]
    fn test_init_without_history_server() {
        let mut phase = ConnectedPhase::new(10);
        phase.init(&info(None));
        assert!(phase.history_server().is_none());
        assert!(phase.history_url().is_none());
    }

    #[test]
    fn test_logs_append() {
        let mut phase = ConnectedPhase::new(10);
        phase.init(&info(None));
        phase.log("Stage 1 complete");
        assert_eq!(phase.logs().latest(), Some("Stage 1 complete"));
    }
}
