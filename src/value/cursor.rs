use crate::{
    driver::StmtHandle,
    wire::{self, TypeCode, WireBuffer, CURSOR_WIRE_SIZE},
    Result, SqlCallError,
};

/// Nested result set handle.
///
/// The engine fills the buffer with a statement handle when the owning row
/// is fetched. A cursor has no scalar meaning: every scalar conversion fails
/// with a type error, including the default-supplying ones.
#[derive(Clone, Debug)]
pub struct Cursor {
    buf: WireBuffer,
}

impl Default for Cursor {
    fn default() -> Self {
        Self::new()
    }
}

impl Cursor {
    pub fn new() -> Self {
        Self {
            buf: WireBuffer::new(TypeCode::RSET, CURSOR_WIRE_SIZE),
        }
    }

    /// True until the engine has populated the handle.
    pub fn is_null(&self) -> bool {
        self.buf.is_null()
    }

    pub fn set_null(&mut self) {
        self.buf.set_null();
    }

    pub fn handle(&self) -> Option<StmtHandle> {
        if self.is_null() {
            return None;
        }
        wire::decode_cursor(self.buf.bytes()).map(StmtHandle)
    }

    pub(crate) fn scalar_error(&self, op: &'static str) -> SqlCallError {
        SqlCallError::type_mismatch(op, "a cursor cannot be converted to a scalar value")
    }

    pub fn type_code(&self) -> TypeCode {
        self.buf.type_code()
    }

    pub fn max_wire_size(&self) -> usize {
        self.buf.capacity()
    }

    pub(crate) fn wire(&self) -> &WireBuffer {
        &self.buf
    }

    pub(crate) fn wire_mut(&mut self) -> &mut WireBuffer {
        &mut self.buf
    }

    pub(crate) fn sql_literal(&self) -> Result<String> {
        Err(self.scalar_error("Cursor::sql_literal"))
    }
}
