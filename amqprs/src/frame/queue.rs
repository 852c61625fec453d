//! Queue class (50) method argument schemas.

use amqp_serde::types::{FieldTable, PackedBits, ShortStr};
use serde::{Deserialize, Serialize};

use super::constants::queue::*;
use super::constants::CLASS_QUEUE;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Declare {
    reserved_1: u16,
    queue: ShortStr,
    flags: PackedBits, // bit0=passive bit1=durable bit2=exclusive bit3=auto_delete bit4=no_wait
    arguments: FieldTable,
}
impl Declare {
    pub const CLASS_ID: u16 = CLASS_QUEUE;
    pub const METHOD_ID: u16 = DECLARE;

    #[allow(clippy::too_many_arguments)]
    pub fn new(
        queue: ShortStr,
        passive: bool,
        durable: bool,
        exclusive: bool,
        auto_delete: bool,
        no_wait: bool,
        arguments: FieldTable,
    ) -> Self {
        Self {
            reserved_1: 0,
            queue,
            flags: PackedBits::new(&[passive, durable, exclusive, auto_delete, no_wait]),
            arguments,
        }
    }
    pub fn no_wait(&self) -> bool {
        self.flags.get(4)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeclareOk {
    queue: ShortStr,
    message_count: u32,
    consumer_count: u32,
}
impl DeclareOk {
    pub const CLASS_ID: u16 = CLASS_QUEUE;
    pub const METHOD_ID: u16 = DECLARE_OK;

    pub fn queue(&self) -> &ShortStr {
        &self.queue
    }
    pub fn message_count(&self) -> u32 {
        self.message_count
    }
    pub fn consumer_count(&self) -> u32 {
        self.consumer_count
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bind {
    reserved_1: u16,
    queue: ShortStr,
    exchange: ShortStr,
    routing_key: ShortStr,
    no_wait: bool,
    arguments: FieldTable,
}
impl Bind {
    pub const CLASS_ID: u16 = CLASS_QUEUE;
    pub const METHOD_ID: u16 = BIND;

    pub fn new(
        queue: ShortStr,
        exchange: ShortStr,
        routing_key: ShortStr,
        no_wait: bool,
        arguments: FieldTable,
    ) -> Self {
        Self { reserved_1: 0, queue, exchange, routing_key, no_wait, arguments }
    }
    pub fn no_wait(&self) -> bool {
        self.no_wait
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BindOk;
impl BindOk {
    pub const CLASS_ID: u16 = CLASS_QUEUE;
    pub const METHOD_ID: u16 = BIND_OK;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Unbind {
    reserved_1: u16,
    queue: ShortStr,
    exchange: ShortStr,
    routing_key: ShortStr,
    arguments: FieldTable,
}
impl Unbind {
    pub const CLASS_ID: u16 = CLASS_QUEUE;
    pub const METHOD_ID: u16 = UNBIND;

    pub fn new(queue: ShortStr, exchange: ShortStr, routing_key: ShortStr, arguments: FieldTable) -> Self {
        Self { reserved_1: 0, queue, exchange, routing_key, arguments }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UnbindOk;
impl UnbindOk {
    pub const CLASS_ID: u16 = CLASS_QUEUE;
    pub const METHOD_ID: u16 = UNBIND_OK;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Purge {
    reserved_1: u16,
    queue: ShortStr,
    no_wait: bool,
}
impl Purge {
    pub const CLASS_ID: u16 = CLASS_QUEUE;
    pub const METHOD_ID: u16 = PURGE;

    pub fn new(queue: ShortStr, no_wait: bool) -> Self {
        Self { reserved_1: 0, queue, no_wait }
    }
    pub fn no_wait(&self) -> bool {
        self.no_wait
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurgeOk {
    message_count: u32,
}
impl PurgeOk {
    pub const CLASS_ID: u16 = CLASS_QUEUE;
    pub const METHOD_ID: u16 = PURGE_OK;

    pub fn message_count(&self) -> u32 {
        self.message_count
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Delete {
    reserved_1: u16,
    queue: ShortStr,
    flags: PackedBits, // bit0=if_unused bit1=if_empty bit2=no_wait
}
impl Delete {
    pub const CLASS_ID: u16 = CLASS_QUEUE;
    pub const METHOD_ID: u16 = DELETE;

    pub fn new(queue: ShortStr, if_unused: bool, if_empty: bool, no_wait: bool) -> Self {
        Self { reserved_1: 0, queue, flags: PackedBits::new(&[if_unused, if_empty, no_wait]) }
    }
    pub fn no_wait(&self) -> bool {
        self.flags.get(2)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteOk {
    message_count: u32,
}
impl DeleteOk {
    pub const CLASS_ID: u16 = CLASS_QUEUE;
    pub const METHOD_ID: u16 = DELETE_OK;

    pub fn message_count(&self) -> u32 {
        self.message_count
    }
}
