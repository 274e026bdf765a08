//! State transmission methods

use async_trait::async_trait;
use thiserror::Error;

use crate::{models, panel::PanelState};

mod stdout;
pub use stdout::Stdout;

mod udp;
pub use udp::Udp;

#[derive(Debug, Error)]
pub enum MethodError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("encoding error: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("could not resolve {address}")]
    Unresolved { address: String },
    #[error("short write: {written} out of {expected} bytes")]
    ShortWrite { written: usize, expected: usize },
}

pub type WriteResult = Result<(), MethodError>;

/// Serialize a state as one NUL-terminated record
pub fn encode_record(state: &PanelState, buffer: &mut Vec<u8>) -> Result<(), MethodError> {
    buffer.clear();
    serde_json::to_writer(&mut *buffer, state)?;
    buffer.push(0);
    Ok(())
}

#[async_trait]
pub trait Method: Send {
    async fn write(&mut self, state: &PanelState) -> WriteResult;
}

pub fn from_config(config: &models::Method) -> Box<dyn Method> {
    match config {
        models::Method::Udp(udp) => Box::new(Udp::new(udp.address.clone())),
        models::Method::Stdout => Box::new(Stdout::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::panel::{Delay, Fan, Mode};

    #[test]
    fn records_are_nul_terminated() {
        let state = PanelState {
            fan: Fan::Auto,
            mode: Mode::None,
            delay: Delay::Off,
            ms_digit: 2,
            ls_digit: -1,
            filter_bad: true,
        };

        let mut buffer = b"stale".to_vec();
        encode_record(&state, &mut buffer).unwrap();

        assert_eq!(
            buffer,
            &b"{\"fan\":\"FAN_AUTO\",\"mode\":\"MODE_NONE\",\"delay\":\"DELAY_OFF\",\"msdigit\":2,\"lsdigit\":-1,\"filterbad\":\"True\"}\0"[..]
        );
    }
}
