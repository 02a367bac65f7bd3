//! In-memory register transport for tests.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::TransportError;
use crate::transport::RegisterTransport;

/// A transport call as seen by [`MockTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    Connect,
    Read { address: u16, count: u16 },
    Write { address: u16, values: Vec<u16> },
    SetSlave(u8),
    Release,
}

/// Trace entry. Reads and writes are bracketed by `Begin`/`End` with a
/// scheduler yield in between, so overlapping transactions show up as
/// interleaved entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraceEvent {
    Begin(MockCall),
    End,
}

#[derive(Debug, Default)]
struct MockState {
    connected: bool,
    slave: u8,
    registers: BTreeMap<u16, u16>,
    calls: Vec<MockCall>,
    trace: Vec<TraceEvent>,
    read_fault: Option<TransportError>,
    write_fault: Option<TransportError>,
    connect_fault: Option<TransportError>,
}

/// Register map held in memory. Clones share state, so a test can keep a
/// handle while the gripper owns another.
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// A mock that starts with the link up.
    pub fn connected() -> Self {
        let mock = Self::new();
        mock.state.lock().connected = true;
        mock
    }

    pub fn set_registers(&self, address: u16, values: &[u16]) {
        let mut state = self.state.lock();
        for (offset, value) in values.iter().enumerate() {
            state.registers.insert(address + offset as u16, *value);
        }
    }

    pub fn registers(&self, address: u16, count: u16) -> Vec<u16> {
        let state = self.state.lock();
        (address..address + count)
            .map(|a| state.registers.get(&a).copied().unwrap_or(0))
            .collect()
    }

    pub fn calls(&self) -> Vec<MockCall> {
        self.state.lock().calls.clone()
    }

    /// Payloads of every write, in order.
    pub fn writes(&self) -> Vec<Vec<u16>> {
        self.state
            .lock()
            .calls
            .iter()
            .filter_map(|call| match call {
                MockCall::Write { values, .. } => Some(values.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn trace(&self) -> Vec<TraceEvent> {
        self.state.lock().trace.clone()
    }

    pub fn slave(&self) -> u8 {
        self.state.lock().slave
    }

    /// Make every read fail with `error` until cleared with `None`.
    pub fn fail_reads(&self, error: Option<TransportError>) {
        self.state.lock().read_fault = error;
    }

    pub fn fail_writes(&self, error: Option<TransportError>) {
        self.state.lock().write_fault = error;
    }

    pub fn refuse_connect(&self, error: Option<TransportError>) {
        self.state.lock().connect_fault = error;
    }

    /// Simulate the link going down.
    pub fn disconnect(&self) {
        self.state.lock().connected = false;
    }

    fn begin(&self, call: MockCall) -> Result<(), TransportError> {
        let mut state = self.state.lock();
        state.calls.push(call.clone());
        state.trace.push(TraceEvent::Begin(call));
        if state.connected {
            Ok(())
        } else {
            state.trace.push(TraceEvent::End);
            Err(TransportError::NotConnected)
        }
    }

    fn end(&self) {
        self.state.lock().trace.push(TraceEvent::End);
    }
}

impl RegisterTransport for MockTransport {
    fn is_connected(&self) -> bool {
        self.state.lock().connected
    }

    async fn connect(&mut self) -> Result<(), TransportError> {
        let mut state = self.state.lock();
        state.calls.push(MockCall::Connect);
        if let Some(error) = state.connect_fault.clone() {
            return Err(error);
        }
        state.connected = true;
        Ok(())
    }

    async fn read_registers(&mut self, address: u16, count: u16) -> Result<Vec<u16>, TransportError> {
        self.begin(MockCall::Read { address, count })?;
        tokio::task::yield_now().await;

        let fault = self.state.lock().read_fault.clone();
        let result = match fault {
            Some(error) => Err(error),
            None => Ok(self.registers(address, count)),
        };
        self.end();
        result
    }

    async fn write_registers(&mut self, address: u16, values: &[u16]) -> Result<(), TransportError> {
        self.begin(MockCall::Write {
            address,
            values: values.to_vec(),
        })?;
        tokio::task::yield_now().await;

        let fault = self.state.lock().write_fault.clone();
        let result = match fault {
            Some(error) => Err(error),
            None => {
                self.set_registers(address, values);
                Ok(())
            }
        };
        self.end();
        result
    }

    fn set_slave(&mut self, slave: u8) {
        let mut state = self.state.lock();
        state.calls.push(MockCall::SetSlave(slave));
        state.slave = slave;
    }

    async fn release(&mut self) {
        let mut state = self.state.lock();
        state.calls.push(MockCall::Release);
        state.connected = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_write_then_read() {
        let mut mock = MockTransport::connected();
        mock.write_registers(10, &[1, 2, 3]).await.unwrap();

        assert_eq!(mock.read_registers(10, 4).await.unwrap(), vec![1, 2, 3, 0]);
        assert_eq!(mock.writes(), vec![vec![1, 2, 3]]);
        assert_eq!(
            mock.trace(),
            vec![
                TraceEvent::Begin(MockCall::Write {
                    address: 10,
                    values: vec![1, 2, 3]
                }),
                TraceEvent::End,
                TraceEvent::Begin(MockCall::Read {
                    address: 10,
                    count: 4
                }),
                TraceEvent::End,
            ]
        );
    }

    #[tokio::test]
    async fn test_disconnected_calls_fail() {
        let mut mock = MockTransport::new();
        assert_eq!(
            mock.read_registers(0, 1).await,
            Err(TransportError::NotConnected)
        );

        mock.connect().await.unwrap();
        assert!(mock.is_connected());

        mock.release().await;
        assert_eq!(
            mock.write_registers(0, &[1]).await,
            Err(TransportError::NotConnected)
        );
        assert_eq!(mock.registers(0, 1), vec![0]);
    }

    #[tokio::test]
    async fn test_fault_injection() {
        let mut mock = MockTransport::connected();
        mock.fail_writes(Some(TransportError::Exception("IllegalFunction".into())));

        assert!(matches!(
            mock.write_registers(0, &[1]).await,
            Err(TransportError::Exception(_))
        ));
        assert_eq!(mock.registers(0, 1), vec![0]);

        mock.fail_writes(None);
        mock.write_registers(0, &[1]).await.unwrap();
        assert_eq!(mock.registers(0, 1), vec![1]);

        let handle = mock.clone();
        handle.refuse_connect(Some(TransportError::Connection("busy".into())));
        handle.disconnect();
        assert!(mock.connect().await.is_err());
        assert!(!mock.is_connected());
    }
}
