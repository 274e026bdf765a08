//! Definition of the Stdout method

use async_trait::async_trait;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use super::{Method, WriteResult};
use crate::panel::PanelState;

/// Prints every panel state as one JSON line
pub struct Stdout<W = tokio::io::Stdout> {
    out: W,
    last: Option<PanelState>,
}

impl Stdout {
    pub fn new() -> Self {
        Self::with_writer(tokio::io::stdout())
    }
}

impl Default for Stdout {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: AsyncWrite + Unpin + Send> Stdout<W> {
    pub fn with_writer(out: W) -> Self {
        Self { out, last: None }
    }
}

#[async_trait]
impl<W: AsyncWrite + Unpin + Send> Method for Stdout<W> {
    async fn write(&mut self, state: &PanelState) -> WriteResult {
        if self.last.as_ref() != Some(state) {
            info!(%state, "panel state changed");
            self.last = Some(*state);
        }

        let mut line = state.to_record()?;
        line.push('\n');
        self.out.write_all(line.as_bytes()).await?;
        self.out.flush().await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::panel::Mode;

    #[tokio::test]
    async fn writes_one_line_per_state() {
        let mut method = Stdout::with_writer(Vec::new());
        method.write(&PanelState::default()).await.unwrap();
        method
            .write(&PanelState {
                mode: Mode::Cool,
                ..Default::default()
            })
            .await
            .unwrap();

        let output = String::from_utf8(method.out).unwrap();
        let lines: Vec<_> = output.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("{\"fan\":\"FAN_NONE\""));
        assert!(lines[1].contains("\"mode\":\"MODE_COOL\""));
    }
}
