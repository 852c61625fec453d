//! Channel class (20) method argument schemas.

use amqp_serde::types::ShortStr;
use serde::{Deserialize, Serialize};

use super::constants::channel::*;
use super::constants::CLASS_CHANNEL;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Open {
    reserved_1: ShortStr,
}
impl Open {
    pub const CLASS_ID: u16 = CLASS_CHANNEL;
    pub const METHOD_ID: u16 = OPEN;
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OpenOk {
    reserved_1: amqp_serde::types::LongStr,
}
impl OpenOk {
    pub const CLASS_ID: u16 = CLASS_CHANNEL;
    pub const METHOD_ID: u16 = OPEN_OK;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Flow {
    active: bool,
}
impl Flow {
    pub const CLASS_ID: u16 = CLASS_CHANNEL;
    pub const METHOD_ID: u16 = FLOW;

    pub fn new(active: bool) -> Self {
        Self { active }
    }
    pub fn active(&self) -> bool {
        self.active
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowOk {
    active: bool,
}
impl FlowOk {
    pub const CLASS_ID: u16 = CLASS_CHANNEL;
    pub const METHOD_ID: u16 = FLOW_OK;

    pub fn new(active: bool) -> Self {
        Self { active }
    }
    pub fn active(&self) -> bool {
        self.active
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Close {
    reply_code: u16,
    reply_text: ShortStr,
    class_id: u16,
    method_id: u16,
}
impl Close {
    pub const CLASS_ID: u16 = CLASS_CHANNEL;
    pub const METHOD_ID: u16 = CLOSE;

    pub fn new(reply_code: u16, reply_text: ShortStr, class_id: u16, method_id: u16) -> Self {
        Self { reply_code, reply_text, class_id, method_id }
    }
    pub fn reply_code(&self) -> u16 {
        self.reply_code
    }
    pub fn reply_text(&self) -> &ShortStr {
        &self.reply_text
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CloseOk;
impl CloseOk {
    pub const CLASS_ID: u16 = CLASS_CHANNEL;
    pub const METHOD_ID: u16 = CLOSE_OK;
}
