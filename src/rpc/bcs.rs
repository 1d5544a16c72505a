//! Minimal BCS encoding of a programmable transaction kind holding one move
//! call. Inspection calls need the kind bytes, which the node does not build
//! for us.

use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::constants::ADDRESS_LENGTH;

// Enum variant indices of the on-chain types.
const KIND_PROGRAMMABLE: u64 = 0;
const CALL_ARG_OBJECT: u64 = 1;
const OBJECT_ARG_SHARED: u64 = 1;
const COMMAND_MOVE_CALL: u64 = 0;
const ARGUMENT_INPUT: u64 = 1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallArg {
    SharedObject {
        id: [u8; ADDRESS_LENGTH],
        initial_shared_version: u64,
        mutable: bool,
    },
}

#[derive(Debug, Clone)]
pub struct MoveCall {
    pub package: [u8; ADDRESS_LENGTH],
    pub module: String,
    pub function: String,
    pub arguments: Vec<CallArg>,
}

impl MoveCall {
    /// `TransactionKind::ProgrammableTransaction` with every argument passed
    /// as an input of the single command.
    pub fn to_transaction_kind(&self) -> Vec<u8> {
        let mut writer = BcsWriter::default();
        writer.uleb128(KIND_PROGRAMMABLE);

        writer.uleb128(self.arguments.len() as u64);
        for arg in &self.arguments {
            match arg {
                CallArg::SharedObject {
                    id,
                    initial_shared_version,
                    mutable,
                } => {
                    writer.uleb128(CALL_ARG_OBJECT);
                    writer.uleb128(OBJECT_ARG_SHARED);
                    writer.fixed(id);
                    writer.u64(*initial_shared_version);
                    writer.bool(*mutable);
                }
            }
        }

        writer.uleb128(1);
        writer.uleb128(COMMAND_MOVE_CALL);
        writer.fixed(&self.package);
        writer.str(&self.module);
        writer.str(&self.function);
        writer.uleb128(0); // type arguments
        writer.uleb128(self.arguments.len() as u64);
        for index in 0..self.arguments.len() {
            writer.uleb128(ARGUMENT_INPUT);
            writer.u16(index as u16);
        }

        writer.into_bytes()
    }

    pub fn to_transaction_kind_base64(&self) -> String {
        STANDARD.encode(self.to_transaction_kind())
    }
}

#[derive(Debug, Default)]
pub struct BcsWriter {
    buf: Vec<u8>,
}

impl BcsWriter {
    pub fn uleb128(&mut self, mut value: u64) {
        loop {
            let byte = (value & 0x7f) as u8;
            value >>= 7;
            if value == 0 {
                self.buf.push(byte);
                break;
            }
            self.buf.push(byte | 0x80);
        }
    }

    pub fn u16(&mut self, value: u16) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn u64(&mut self, value: u64) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn bool(&mut self, value: bool) {
        self.buf.push(u8::from(value));
    }

    /// Length-prefixed byte vector.
    pub fn bytes(&mut self, value: &[u8]) {
        self.uleb128(value.len() as u64);
        self.buf.extend_from_slice(value);
    }

    /// Fixed-width array, no length prefix.
    pub fn fixed(&mut self, value: &[u8]) {
        self.buf.extend_from_slice(value);
    }

    pub fn str(&mut self, value: &str) {
        self.bytes(value.as_bytes());
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uleb128_multi_byte() {
        let mut writer = BcsWriter::default();
        writer.uleb128(0);
        writer.uleb128(127);
        writer.uleb128(128);
        writer.uleb128(300);
        assert_eq!(writer.into_bytes(), vec![0x00, 0x7f, 0x80, 0x01, 0xac, 0x02]);
    }

    #[test]
    fn shared_object_move_call_layout() {
        let mut package = [0_u8; 32];
        package[31] = 0xaa;
        let mut id = [0_u8; 32];
        id[0] = 0x11;

        let call = MoveCall {
            package,
            module: "game".to_string(),
            function: "get_game_state".to_string(),
            arguments: vec![CallArg::SharedObject {
                id,
                initial_shared_version: 7,
                mutable: false,
            }],
        };
        let bytes = call.to_transaction_kind();

        // kind, one input, Object, Shared
        assert_eq!(&bytes[..4], &[0, 1, 1, 1]);
        assert_eq!(bytes[4], 0x11);
        // version 7 (u64 LE) then immutable flag
        assert_eq!(&bytes[36..44], &[7, 0, 0, 0, 0, 0, 0, 0]);
        assert_eq!(bytes[44], 0);
        // one command, MoveCall, package
        assert_eq!(&bytes[45..47], &[1, 0]);
        assert_eq!(bytes[47 + 31], 0xaa);

        let after_package = 47 + 32;
        assert_eq!(bytes[after_package], 4);
        assert_eq!(&bytes[after_package + 1..after_package + 5], b"game");

        // no type args, one Input(0) argument
        assert_eq!(&bytes[bytes.len() - 5..], &[0, 1, 1, 0, 0]);
    }
}
