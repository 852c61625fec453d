//! Connection class (10) method argument schemas.

use amqp_serde::types::{AmqpPeerProperties, FieldTable, LongStr, ShortStr};
use serde::{Deserialize, Serialize};

use super::constants::connection::*;
use super::constants::CLASS_CONNECTION;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Start {
    version_major: u8,
    version_minor: u8,
    server_properties: FieldTable,
    mechanisms: LongStr,
    locales: LongStr,
}
impl Start {
    pub const CLASS_ID: u16 = CLASS_CONNECTION;
    pub const METHOD_ID: u16 = START;

    pub fn server_properties(&self) -> &FieldTable {
        &self.server_properties
    }

    #[cfg(test)]
    pub(crate) fn new(server_properties: FieldTable) -> Self {
        Self {
            version_major: 0,
            version_minor: 9,
            server_properties,
            mechanisms: "AMQPLAIN".try_into().unwrap(),
            locales: "en_US".try_into().unwrap(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StartOk {
    client_properties: AmqpPeerProperties,
    mechanism: ShortStr,
    response: FieldTable,
    locale: ShortStr,
}
impl StartOk {
    pub const CLASS_ID: u16 = CLASS_CONNECTION;
    pub const METHOD_ID: u16 = START_OK;

    pub fn new(
        client_properties: AmqpPeerProperties,
        mechanism: ShortStr,
        response: FieldTable,
        locale: ShortStr,
    ) -> Self {
        Self { client_properties, mechanism, response, locale }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tune {
    channel_max: u16,
    frame_max: u32,
    heartbeat: u16,
}
impl Tune {
    pub const CLASS_ID: u16 = CLASS_CONNECTION;
    pub const METHOD_ID: u16 = TUNE;

    pub fn channel_max(&self) -> u16 {
        self.channel_max
    }
    pub fn frame_max(&self) -> u32 {
        self.frame_max
    }
    pub fn heartbeat(&self) -> u16 {
        self.heartbeat
    }

    #[cfg(test)]
    pub(crate) fn new(channel_max: u16, frame_max: u32, heartbeat: u16) -> Self {
        Self { channel_max, frame_max, heartbeat }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TuneOk {
    channel_max: u16,
    frame_max: u32,
    heartbeat: u16,
}
impl TuneOk {
    pub const CLASS_ID: u16 = CLASS_CONNECTION;
    pub const METHOD_ID: u16 = TUNE_OK;

    pub fn new(channel_max: u16, frame_max: u32, heartbeat: u16) -> Self {
        Self { channel_max, frame_max, heartbeat }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Open {
    virtual_host: ShortStr,
    capabilities: ShortStr,
    insist: bool,
}
impl Default for Open {
    fn default() -> Self {
        Self {
            virtual_host: "/".try_into().unwrap(),
            capabilities: "".try_into().unwrap(),
            insist: false,
        }
    }
}
impl Open {
    pub const CLASS_ID: u16 = CLASS_CONNECTION;
    pub const METHOD_ID: u16 = OPEN;

    pub fn new(virtual_host: ShortStr, capabilities: ShortStr, insist: bool) -> Self {
        Self { virtual_host, capabilities, insist }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenOk {
    known_hosts: ShortStr,
}
impl Default for OpenOk {
    fn default() -> Self {
        Self { known_hosts: "".try_into().unwrap() }
    }
}
impl OpenOk {
    pub const CLASS_ID: u16 = CLASS_CONNECTION;
    pub const METHOD_ID: u16 = OPEN_OK;

    #[cfg(test)]
    pub fn new(known_hosts: &str) -> Self {
        Self { known_hosts: known_hosts.try_into().unwrap() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Close {
    reply_code: u16,
    reply_text: ShortStr,
    class_id: u16,
    method_id: u16,
}
impl Default for Close {
    fn default() -> Self {
        Self { reply_code: 0, reply_text: "".try_into().unwrap(), class_id: 0, method_id: 0 }
    }
}
impl Close {
    pub const CLASS_ID: u16 = CLASS_CONNECTION;
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
    pub const CLASS_ID: u16 = CLASS_CONNECTION;
    pub const METHOD_ID: u16 = CLOSE_OK;
}
