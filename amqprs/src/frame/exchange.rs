//! Exchange class (40) method argument schemas.

use amqp_serde::types::{FieldTable, PackedBits, ShortStr};
use serde::{Deserialize, Serialize};

use super::constants::exchange::*;
use super::constants::CLASS_EXCHANGE;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Declare {
    reserved_1: u16,
    exchange: ShortStr,
    exchange_type: ShortStr,
    flags: PackedBits, // bit0=passive bit1=durable bit2=auto_delete bit3=internal bit4=no_wait
    arguments: FieldTable,
}
impl Declare {
    pub const CLASS_ID: u16 = CLASS_EXCHANGE;
    pub const METHOD_ID: u16 = DECLARE;

    pub fn new(
        exchange: ShortStr,
        exchange_type: ShortStr,
        passive: bool,
        durable: bool,
        auto_delete: bool,
        internal: bool,
        no_wait: bool,
        arguments: FieldTable,
    ) -> Self {
        Self {
            reserved_1: 0,
            exchange,
            exchange_type,
            flags: PackedBits::new(&[passive, durable, auto_delete, internal, no_wait]),
            arguments,
        }
    }
    pub fn no_wait(&self) -> bool {
        self.flags.get(4)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeclareOk;
impl DeclareOk {
    pub const CLASS_ID: u16 = CLASS_EXCHANGE;
    pub const METHOD_ID: u16 = DECLARE_OK;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Delete {
    reserved_1: u16,
    exchange: ShortStr,
    flags: PackedBits, // bit0=if_unused bit1=no_wait
}
impl Delete {
    pub const CLASS_ID: u16 = CLASS_EXCHANGE;
    pub const METHOD_ID: u16 = DELETE;

    pub fn new(exchange: ShortStr, if_unused: bool, no_wait: bool) -> Self {
        Self { reserved_1: 0, exchange, flags: PackedBits::new(&[if_unused, no_wait]) }
    }
    pub fn no_wait(&self) -> bool {
        self.flags.get(1)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeleteOk;
impl DeleteOk {
    pub const CLASS_ID: u16 = CLASS_EXCHANGE;
    pub const METHOD_ID: u16 = DELETE_OK;
}
