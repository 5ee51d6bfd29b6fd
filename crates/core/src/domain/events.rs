/// One unit of the canonical per-request streaming protocol.
///
/// Every session emits `Start` exactly once and first, `End` exactly once and
/// last, any number of `Data` fragments strictly between, and at most one
/// `Error` immediately before `End`. No `Data` may follow an `Error`. Every
/// transport binding must preserve this ordering; the session controller in
/// `savor-agent` is the single producer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionEvent {
    Start,
    Data(String),
    Error(String),
    End,
}

impl SessionEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionEvent::End)
    }
}
