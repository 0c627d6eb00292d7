//! MQTT 3.1.1 control packets over a fixed buffer.
//!
//! An [`MqttMessage`] owns one [`FixedBuffer`] and a [`FieldTree`] laid out
//! as fixed header byte, remaining length, and a body whose type-specific
//! fields are children of the body field:
//!
//! ```text
//! header ─► remaining length ─► body
//!                                ├── topic (u16 length + UTF-8)
//!                                ├── packet id (QoS > 0)
//!                                └── payload
//! ```
//!
//! Outgoing packets are built with the `init_*` methods. Incoming bytes are
//! copied into the buffer (see [`MqttMessage::push_received`]) and mapped in
//! place by [`MqttMessage::validate_received_bytes`]. Accessors return views
//! into the buffer and fail with [`Error::NotConfigured`] until one of those
//! two paths succeeded.

use crate::codec::length::{decode_remaining_length, encode_remaining_length};
use crate::codec::{Error, FieldId, FieldTree, FixedBuffer};

/// Number of fields a single message can carry.
pub const MAX_FIELDS: usize = 16;

/// Largest length-prefixed string the wire format can carry.
pub const MAX_STRING_LEN: usize = u16::MAX as usize;

const PROTOCOL_HEADER: [u8; 7] = [0x00, 0x04, b'M', b'Q', b'T', b'T', 0x04];

const FLAG_CLEAN_SESSION: u8 = 0x02;
const FLAG_WILL: u8 = 0x04;
const FLAG_PASSWORD: u8 = 0x40;
const FLAG_USERNAME: u8 = 0x80;

/// Quality of Service levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum QoS {
    /// Fire and forget.
    AtMostOnce = 0,
    /// Acknowledged delivery.
    AtLeastOnce = 1,
    /// Assured delivery.
    ExactlyOnce = 2,
}

impl QoS {
    /// Decode a two-bit QoS value. `3` is reserved and yields `None`.
    pub fn from_bits(bits: u8) -> Option<Self> {
        match bits {
            0 => Some(QoS::AtMostOnce),
            1 => Some(QoS::AtLeastOnce),
            2 => Some(QoS::ExactlyOnce),
            _ => None,
        }
    }

    /// The two-bit wire value.
    pub fn bits(self) -> u8 {
        self as u8
    }
}

/// Supported control packet types, valued by their header nibble.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PacketType {
    /// Client request to connect.
    Connect = 1,
    /// Connect acknowledgment.
    ConnAck = 2,
    /// Publish message.
    Publish = 3,
    /// QoS 1 publish acknowledgment.
    PubAck = 4,
    /// Subscribe request.
    Subscribe = 8,
    /// Subscribe acknowledgment.
    SubAck = 9,
    /// Ping request.
    PingReq = 12,
    /// Ping response.
    PingResp = 13,
    /// Client is disconnecting.
    Disconnect = 14,
}

impl PacketType {
    /// Map the upper nibble of a fixed header to a packet type.
    pub fn from_nibble(nibble: u8) -> Result<Self, Error> {
        match nibble {
            1 => Ok(PacketType::Connect),
            2 => Ok(PacketType::ConnAck),
            3 => Ok(PacketType::Publish),
            4 => Ok(PacketType::PubAck),
            8 => Ok(PacketType::Subscribe),
            9 => Ok(PacketType::SubAck),
            12 => Ok(PacketType::PingReq),
            13 => Ok(PacketType::PingResp),
            14 => Ok(PacketType::Disconnect),
            other => Err(Error::UnknownPacketType(other)),
        }
    }

    fn header_byte(self, flags: u8) -> u8 {
        ((self as u8) << 4) | (flags & 0x0F)
    }
}

/// Optional username and password sent with CONNECT.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Credentials<'a> {
    /// User name.
    pub username: Option<&'a str>,
    /// Password. Only sent together with a user name.
    pub password: Option<&'a str>,
}

#[derive(Debug, Clone, Copy)]
struct Frame {
    length: FieldId,
    body: FieldId,
}

#[derive(Debug, Clone, Copy)]
enum Layout {
    Connect {
        flags: FieldId,
        keep_alive: FieldId,
        client_id: FieldId,
        username: Option<FieldId>,
        password: Option<FieldId>,
    },
    ConnAck {
        flags: FieldId,
        return_code: FieldId,
    },
    Publish {
        topic: FieldId,
        packet_id: Option<FieldId>,
        payload: FieldId,
    },
    PacketId {
        packet_id: FieldId,
    },
    Subscribe {
        packet_id: FieldId,
        filters: FieldId,
    },
    SubAck {
        packet_id: FieldId,
        return_codes: FieldId,
    },
    Empty,
}

#[derive(Debug, Clone, Copy)]
struct Configured {
    packet_type: PacketType,
    frame: Frame,
    layout: Layout,
}

/// One MQTT control packet in a buffer of `N` bytes.
#[derive(Debug, Clone)]
pub struct MqttMessage<const N: usize> {
    buffer: FixedBuffer<N>,
    fields: FieldTree<MAX_FIELDS>,
    configured: Option<Configured>,
}

impl<const N: usize> MqttMessage<N> {
    /// Create an empty, unconfigured message.
    pub const fn new() -> Self {
        Self {
            buffer: FixedBuffer::new(),
            fields: FieldTree::new(),
            configured: None,
        }
    }

    /// Clear the buffer and forget the layout.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.fields.clear();
        self.configured = None;
    }

    /// Returns `true` after a successful `init_*` or validation.
    pub fn are_fields_configured(&self) -> bool {
        self.configured.is_some()
    }

    /// The configured packet type.
    pub fn packet_type(&self) -> Option<PacketType> {
        self.configured.map(|c| c.packet_type)
    }

    /// The encoded packet.
    pub fn as_bytes(&self) -> &[u8] {
        self.buffer.as_slice()
    }

    /// The underlying buffer.
    pub fn buffer(&self) -> &FixedBuffer<N> {
        &self.buffer
    }

    /// Mutable access to the raw buffer. Drops the current layout.
    pub fn buffer_mut(&mut self) -> &mut FixedBuffer<N> {
        self.fields.clear();
        self.configured = None;
        &mut self.buffer
    }

    /// Append one received byte. Drops the current layout.
    pub fn push_received(&mut self, byte: u8) -> Result<(), Error> {
        self.buffer_mut().push_received(byte)
    }

    /// Number of body bytes after the remaining-length field.
    pub fn remaining_length(&self) -> Result<usize, Error> {
        let configured = self.configured()?;
        self.fields.len(configured.frame.body)
    }

    // ---------------------------------------------------------------------
    // Building
    // ---------------------------------------------------------------------

    /// Build a CONNECT packet.
    pub fn init_connect(
        &mut self,
        client_id: &str,
        keep_alive_seconds: u16,
        clean_session: bool,
        credentials: Credentials<'_>,
    ) -> Result<(), Error> {
        let result = self.build_connect(client_id, keep_alive_seconds, clean_session, credentials);
        self.finish(result)
    }

    /// Build a CONNACK packet.
    pub fn init_connack(&mut self, session_present: bool, return_code: u8) -> Result<(), Error> {
        let result = self.build_connack(session_present, return_code);
        self.finish(result)
    }

    /// Build a PUBLISH packet. `packet_id` is only encoded for QoS above 0.
    pub fn init_publish(
        &mut self,
        topic: &str,
        packet_id: u16,
        qos: QoS,
        retain: bool,
        payload: &[u8],
    ) -> Result<(), Error> {
        let result = self.build_publish(topic, packet_id, qos, retain, payload);
        self.finish(result)
    }

    /// Grow the payload of a built PUBLISH packet.
    pub fn append_payload(&mut self, bytes: &[u8]) -> Result<(), Error> {
        let configured = self.configured()?;
        let Layout::Publish { payload, .. } = configured.layout else {
            return Err(Error::WrongPacketType);
        };
        self.fields.append_bytes(&mut self.buffer, payload, bytes)?;
        if let Err(err) = self.sync_remaining_length(configured.frame) {
            // The payload grew but the length could not follow.
            self.reset();
            return Err(err);
        }
        Ok(())
    }

    /// Build a PUBACK packet.
    pub fn init_puback(&mut self, packet_id: u16) -> Result<(), Error> {
        let result = self.build_puback(packet_id);
        self.finish(result)
    }

    /// Build a SUBSCRIBE packet for one or more topic filters.
    pub fn init_subscribe(&mut self, packet_id: u16, filters: &[(&str, QoS)]) -> Result<(), Error> {
        let result = self.build_subscribe(packet_id, filters);
        self.finish(result)
    }

    /// Build a SUBACK packet.
    pub fn init_suback(&mut self, packet_id: u16, return_codes: &[u8]) -> Result<(), Error> {
        let result = self.build_suback(packet_id, return_codes);
        self.finish(result)
    }

    /// Build a PINGREQ packet.
    pub fn init_pingreq(&mut self) -> Result<(), Error> {
        self.init_empty(PacketType::PingReq)
    }

    /// Build a PINGRESP packet.
    pub fn init_pingresp(&mut self) -> Result<(), Error> {
        self.init_empty(PacketType::PingResp)
    }

    /// Build a DISCONNECT packet.
    pub fn init_disconnect(&mut self) -> Result<(), Error> {
        self.init_empty(PacketType::Disconnect)
    }

    fn init_empty(&mut self, packet_type: PacketType) -> Result<(), Error> {
        let result = self.build_empty(packet_type);
        self.finish(result)
    }

    fn build_connack(
        &mut self,
        session_present: bool,
        return_code: u8,
    ) -> Result<Configured, Error> {
        let frame = self.begin(PacketType::ConnAck, 0)?;
        let flags = self.child(frame.body, &[session_present as u8])?;
        let return_code = self.child(frame.body, &[return_code])?;
        self.seal(
            PacketType::ConnAck,
            frame,
            Layout::ConnAck { flags, return_code },
        )
    }

    fn build_publish(
        &mut self,
        topic: &str,
        packet_id: u16,
        qos: QoS,
        retain: bool,
        payload: &[u8],
    ) -> Result<Configured, Error> {
        let flags = (qos.bits() << 1) | retain as u8;
        let frame = self.begin(PacketType::Publish, flags)?;
        let topic = self.string_child(frame.body, topic.as_bytes())?;
        let packet_id = match qos {
            QoS::AtMostOnce => None,
            _ => Some(self.child(frame.body, &packet_id.to_be_bytes())?),
        };
        let payload = self.child(frame.body, payload)?;
        self.seal(
            PacketType::Publish,
            frame,
            Layout::Publish {
                topic,
                packet_id,
                payload,
            },
        )
    }

    fn build_puback(&mut self, packet_id: u16) -> Result<Configured, Error> {
        let frame = self.begin(PacketType::PubAck, 0)?;
        let packet_id = self.child(frame.body, &packet_id.to_be_bytes())?;
        self.seal(PacketType::PubAck, frame, Layout::PacketId { packet_id })
    }

    fn build_subscribe(
        &mut self,
        packet_id: u16,
        filters: &[(&str, QoS)],
    ) -> Result<Configured, Error> {
        if filters.is_empty() {
            return Err(Error::MalformedPacket);
        }
        let frame = self.begin(PacketType::Subscribe, 0x02)?;
        let packet_id = self.child(frame.body, &packet_id.to_be_bytes())?;
        let list = self.child(frame.body, &[])?;
        for (filter, qos) in filters {
            let len = string_len(filter.as_bytes())?;
            self.fields.append_u16_be(&mut self.buffer, list, len)?;
            self.fields
                .append_bytes(&mut self.buffer, list, filter.as_bytes())?;
            self.fields.append_u8(&mut self.buffer, list, qos.bits())?;
        }
        self.seal(
            PacketType::Subscribe,
            frame,
            Layout::Subscribe {
                packet_id,
                filters: list,
            },
        )
    }

    fn build_suback(&mut self, packet_id: u16, return_codes: &[u8]) -> Result<Configured, Error> {
        if return_codes.is_empty() {
            return Err(Error::MalformedPacket);
        }
        let frame = self.begin(PacketType::SubAck, 0)?;
        let packet_id = self.child(frame.body, &packet_id.to_be_bytes())?;
        let return_codes = self.child(frame.body, return_codes)?;
        self.seal(
            PacketType::SubAck,
            frame,
            Layout::SubAck {
                packet_id,
                return_codes,
            },
        )
    }

    fn build_empty(&mut self, packet_type: PacketType) -> Result<Configured, Error> {
        let frame = self.begin(packet_type, 0)?;
        self.seal(packet_type, frame, Layout::Empty)
    }

    fn build_connect(
        &mut self,
        client_id: &str,
        keep_alive_seconds: u16,
        clean_session: bool,
        credentials: Credentials<'_>,
    ) -> Result<Configured, Error> {
        if credentials.password.is_some() && credentials.username.is_none() {
            return Err(Error::MalformedPacket);
        }
        let mut flag_bits = 0;
        if clean_session {
            flag_bits |= FLAG_CLEAN_SESSION;
        }
        if credentials.username.is_some() {
            flag_bits |= FLAG_USERNAME;
        }
        if credentials.password.is_some() {
            flag_bits |= FLAG_PASSWORD;
        }

        let frame = self.begin(PacketType::Connect, 0)?;
        self.child(frame.body, &PROTOCOL_HEADER)?;
        let flags = self.child(frame.body, &[flag_bits])?;
        let keep_alive = self.child(frame.body, &keep_alive_seconds.to_be_bytes())?;
        let client_id = self.string_child(frame.body, client_id.as_bytes())?;
        let username = match credentials.username {
            Some(user) => Some(self.string_child(frame.body, user.as_bytes())?),
            None => None,
        };
        let password = match credentials.password {
            Some(pass) => Some(self.string_child(frame.body, pass.as_bytes())?),
            None => None,
        };
        self.seal(
            PacketType::Connect,
            frame,
            Layout::Connect {
                flags,
                keep_alive,
                client_id,
                username,
                password,
            },
        )
    }

    fn begin(&mut self, packet_type: PacketType, flags: u8) -> Result<Frame, Error> {
        self.reset();
        self.buffer.append_u8(packet_type.header_byte(flags))?;
        let header = self.fields.init_root(&self.buffer, 0, 1)?;
        let length = self.fields.append_after(&mut self.buffer, header, &[0])?;
        let body = self.fields.append_after(&mut self.buffer, length, &[])?;
        Ok(Frame { length, body })
    }

    fn child(&mut self, parent: FieldId, init: &[u8]) -> Result<FieldId, Error> {
        self.fields.init_child(&mut self.buffer, parent, init)
    }

    fn string_child(&mut self, parent: FieldId, value: &[u8]) -> Result<FieldId, Error> {
        let len = string_len(value)?;
        let field = self.child(parent, &len.to_be_bytes())?;
        self.fields.append_bytes(&mut self.buffer, field, value)?;
        Ok(field)
    }

    fn seal(
        &mut self,
        packet_type: PacketType,
        frame: Frame,
        layout: Layout,
    ) -> Result<Configured, Error> {
        self.sync_remaining_length(frame)?;
        Ok(Configured {
            packet_type,
            frame,
            layout,
        })
    }

    fn sync_remaining_length(&mut self, frame: Frame) -> Result<(), Error> {
        let body_len = self.fields.len(frame.body)?;
        let mut encoded = [0u8; 4];
        let used = encode_remaining_length(body_len, &mut encoded)?;
        self.fields
            .set_bytes(&mut self.buffer, frame.length, &encoded[..used])
    }

    fn finish(&mut self, result: Result<Configured, Error>) -> Result<(), Error> {
        match result {
            Ok(configured) => {
                self.configured = Some(configured);
                Ok(())
            }
            Err(err) => {
                self.reset();
                Err(err)
            }
        }
    }

    // ---------------------------------------------------------------------
    // Parsing
    // ---------------------------------------------------------------------

    /// Check the received bytes form exactly one well-formed packet and map
    /// its fields. The bytes stay untouched; on failure the message is left
    /// unconfigured.
    pub fn validate_received_bytes(&mut self) -> Result<PacketType, Error> {
        self.fields.clear();
        self.configured = None;
        let configured = match self.parse() {
            Ok(configured) => configured,
            Err(err) => {
                self.fields.clear();
                return Err(err);
            }
        };
        self.configured = Some(configured);
        Ok(configured.packet_type)
    }

    fn parse(&mut self) -> Result<Configured, Error> {
        let bytes = self.buffer.as_slice();
        let first = *bytes.first().ok_or(Error::MalformedPacket)?;
        let packet_type = PacketType::from_nibble(first >> 4)?;
        let flags = first & 0x0F;
        let flags_ok = match packet_type {
            PacketType::Publish => QoS::from_bits((flags >> 1) & 0x03).is_some(),
            PacketType::Subscribe => flags == 0x02,
            _ => flags == 0,
        };
        if !flags_ok {
            return Err(Error::MalformedPacket);
        }

        let (remaining, used) =
            decode_remaining_length(&bytes[1..])?.ok_or(Error::MalformedLength)?;
        if 1 + used + remaining != bytes.len() {
            return Err(Error::MalformedPacket);
        }

        let header = self.fields.init_root(&self.buffer, 0, 1)?;
        let length = self.fields.map_after(&self.buffer, header, used)?;
        let body = self.fields.map_after(&self.buffer, length, remaining)?;
        let frame = Frame { length, body };
        let mut cursor = Cursor {
            pos: 1 + used,
            end: 1 + used + remaining,
        };

        let layout = match packet_type {
            PacketType::Connect => self.parse_connect(body, &mut cursor)?,
            PacketType::ConnAck => {
                let flags = self.map_field(body, &mut cursor, 1)?;
                if self.buffer.get_u8(self.fields.offset(flags)?)? & 0xFE != 0 {
                    return Err(Error::MalformedPacket);
                }
                let return_code = self.map_field(body, &mut cursor, 1)?;
                Layout::ConnAck { flags, return_code }
            }
            PacketType::Publish => {
                let topic = self.map_string(body, &mut cursor, true)?;
                if self.fields.len(topic)? == 2 {
                    return Err(Error::MalformedPacket);
                }
                let packet_id = if (flags >> 1) & 0x03 != 0 {
                    Some(self.map_field(body, &mut cursor, 2)?)
                } else {
                    None
                };
                let left = cursor.left();
                let payload = self.map_field(body, &mut cursor, left)?;
                Layout::Publish {
                    topic,
                    packet_id,
                    payload,
                }
            }
            PacketType::PubAck => Layout::PacketId {
                packet_id: self.map_field(body, &mut cursor, 2)?,
            },
            PacketType::Subscribe => {
                let packet_id = self.map_field(body, &mut cursor, 2)?;
                let left = cursor.left();
                check_filter_list(self.buffer.get(cursor.pos, left)?)?;
                let filters = self.map_field(body, &mut cursor, left)?;
                Layout::Subscribe { packet_id, filters }
            }
            PacketType::SubAck => {
                let packet_id = self.map_field(body, &mut cursor, 2)?;
                let left = cursor.left();
                if left == 0 {
                    return Err(Error::MalformedPacket);
                }
                let return_codes = self.map_field(body, &mut cursor, left)?;
                let valid = self
                    .fields
                    .get(&self.buffer, return_codes)?
                    .iter()
                    .all(|&code| matches!(code, 0x00..=0x02 | 0x80));
                if !valid {
                    return Err(Error::MalformedPacket);
                }
                Layout::SubAck {
                    packet_id,
                    return_codes,
                }
            }
            PacketType::PingReq | PacketType::PingResp | PacketType::Disconnect => Layout::Empty,
        };

        if cursor.left() != 0 {
            return Err(Error::MalformedPacket);
        }
        Ok(Configured {
            packet_type,
            frame,
            layout,
        })
    }

    fn parse_connect(&mut self, body: FieldId, cursor: &mut Cursor) -> Result<Layout, Error> {
        let protocol = self.map_field(body, cursor, PROTOCOL_HEADER.len())?;
        if self.fields.get(&self.buffer, protocol)? != PROTOCOL_HEADER {
            return Err(Error::MalformedPacket);
        }
        let flags = self.map_field(body, cursor, 1)?;
        let flag_bits = self.buffer.get_u8(self.fields.offset(flags)?)?;
        // Reserved bit, will messages, and password without user name.
        if flag_bits & (0x01 | FLAG_WILL) != 0
            || (flag_bits & FLAG_PASSWORD != 0 && flag_bits & FLAG_USERNAME == 0)
        {
            return Err(Error::MalformedPacket);
        }
        let keep_alive = self.map_field(body, cursor, 2)?;
        let client_id = self.map_string(body, cursor, true)?;
        let username = if flag_bits & FLAG_USERNAME != 0 {
            Some(self.map_string(body, cursor, true)?)
        } else {
            None
        };
        let password = if flag_bits & FLAG_PASSWORD != 0 {
            Some(self.map_string(body, cursor, false)?)
        } else {
            None
        };
        Ok(Layout::Connect {
            flags,
            keep_alive,
            client_id,
            username,
            password,
        })
    }

    fn map_field(
        &mut self,
        body: FieldId,
        cursor: &mut Cursor,
        len: usize,
    ) -> Result<FieldId, Error> {
        if len > cursor.left() {
            return Err(Error::MalformedPacket);
        }
        let field = self.fields.map_child(&self.buffer, body, len)?;
        cursor.pos += len;
        Ok(field)
    }

    fn map_string(
        &mut self,
        body: FieldId,
        cursor: &mut Cursor,
        utf8: bool,
    ) -> Result<FieldId, Error> {
        if cursor.left() < 2 {
            return Err(Error::MalformedPacket);
        }
        let len = self.buffer.get_u16_be(cursor.pos)? as usize;
        let field = self.map_field(body, cursor, 2 + len)?;
        if utf8 {
            let bytes = self.fields.get(&self.buffer, field)?;
            core::str::from_utf8(&bytes[2..]).map_err(|_| Error::InvalidUtf8)?;
        }
        Ok(field)
    }

    // ---------------------------------------------------------------------
    // Accessors
    // ---------------------------------------------------------------------

    /// Topic of a PUBLISH packet.
    pub fn topic_name(&self) -> Result<&str, Error> {
        match self.configured()?.layout {
            Layout::Publish { topic, .. } => self.string(topic),
            _ => Err(Error::WrongPacketType),
        }
    }

    /// Payload of a PUBLISH packet.
    pub fn payload(&self) -> Result<&[u8], Error> {
        match self.configured()?.layout {
            Layout::Publish { payload, .. } => self.fields.get(&self.buffer, payload),
            _ => Err(Error::WrongPacketType),
        }
    }

    /// Packet identifier of PUBLISH (QoS above 0), PUBACK, SUBSCRIBE and
    /// SUBACK packets.
    pub fn packet_id(&self) -> Result<u16, Error> {
        let field = match self.configured()?.layout {
            Layout::Publish {
                packet_id: Some(id),
                ..
            }
            | Layout::PacketId { packet_id: id }
            | Layout::Subscribe { packet_id: id, .. }
            | Layout::SubAck { packet_id: id, .. } => id,
            _ => return Err(Error::WrongPacketType),
        };
        self.buffer.get_u16_be(self.fields.offset(field)?)
    }

    /// QoS of a PUBLISH packet.
    pub fn qos(&self) -> Result<QoS, Error> {
        let flags = self.publish_flags()?;
        QoS::from_bits((flags >> 1) & 0x03).ok_or(Error::MalformedPacket)
    }

    /// Retain flag of a PUBLISH packet.
    pub fn retain(&self) -> Result<bool, Error> {
        Ok(self.publish_flags()? & 0x01 != 0)
    }

    /// Return code of a CONNACK packet. `0` means accepted.
    pub fn connack_return_code(&self) -> Result<u8, Error> {
        match self.configured()?.layout {
            Layout::ConnAck { return_code, .. } => self.byte(return_code),
            _ => Err(Error::WrongPacketType),
        }
    }

    /// Session-present flag of a CONNACK packet.
    pub fn connack_session_present(&self) -> Result<bool, Error> {
        match self.configured()?.layout {
            Layout::ConnAck { flags, .. } => Ok(self.byte(flags)? & 0x01 != 0),
            _ => Err(Error::WrongPacketType),
        }
    }

    /// Return codes of a SUBACK packet, one per requested filter.
    pub fn suback_return_codes(&self) -> Result<&[u8], Error> {
        match self.configured()?.layout {
            Layout::SubAck { return_codes, .. } => self.fields.get(&self.buffer, return_codes),
            _ => Err(Error::WrongPacketType),
        }
    }

    /// Topic filters and requested QoS of a SUBSCRIBE packet.
    pub fn subscribe_filters(&self) -> Result<SubscribeFilters<'_>, Error> {
        match self.configured()?.layout {
            Layout::Subscribe { filters, .. } => Ok(SubscribeFilters {
                bytes: self.fields.get(&self.buffer, filters)?,
            }),
            _ => Err(Error::WrongPacketType),
        }
    }

    /// Client identifier of a CONNECT packet.
    pub fn connect_client_id(&self) -> Result<&str, Error> {
        match self.configured()?.layout {
            Layout::Connect { client_id, .. } => self.string(client_id),
            _ => Err(Error::WrongPacketType),
        }
    }

    /// Keep-alive interval of a CONNECT packet, in seconds.
    pub fn connect_keep_alive(&self) -> Result<u16, Error> {
        match self.configured()?.layout {
            Layout::Connect { keep_alive, .. } => {
                self.buffer.get_u16_be(self.fields.offset(keep_alive)?)
            }
            _ => Err(Error::WrongPacketType),
        }
    }

    /// Clean-session flag of a CONNECT packet.
    pub fn connect_clean_session(&self) -> Result<bool, Error> {
        match self.configured()?.layout {
            Layout::Connect { flags, .. } => Ok(self.byte(flags)? & FLAG_CLEAN_SESSION != 0),
            _ => Err(Error::WrongPacketType),
        }
    }

    /// User name of a CONNECT packet, if present.
    pub fn connect_username(&self) -> Result<Option<&str>, Error> {
        match self.configured()?.layout {
            Layout::Connect { username, .. } => username.map(|f| self.string(f)).transpose(),
            _ => Err(Error::WrongPacketType),
        }
    }

    /// Password of a CONNECT packet, if present.
    pub fn connect_password(&self) -> Result<Option<&[u8]>, Error> {
        match self.configured()?.layout {
            Layout::Connect { password, .. } => password
                .map(|f| -> Result<&[u8], Error> { Ok(&self.fields.get(&self.buffer, f)?[2..]) })
                .transpose(),
            _ => Err(Error::WrongPacketType),
        }
    }

    fn configured(&self) -> Result<Configured, Error> {
        self.configured.ok_or(Error::NotConfigured)
    }

    fn publish_flags(&self) -> Result<u8, Error> {
        match self.configured()?.packet_type {
            PacketType::Publish => Ok(self.buffer.get_u8(0)? & 0x0F),
            _ => Err(Error::WrongPacketType),
        }
    }

    fn byte(&self, field: FieldId) -> Result<u8, Error> {
        self.buffer.get_u8(self.fields.offset(field)?)
    }

    fn string(&self, field: FieldId) -> Result<&str, Error> {
        let bytes = self.fields.get(&self.buffer, field)?;
        let text = bytes.get(2..).ok_or(Error::MalformedPacket)?;
        core::str::from_utf8(text).map_err(|_| Error::InvalidUtf8)
    }
}

impl<const N: usize> Default for MqttMessage<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator over the `(filter, QoS)` pairs of a SUBSCRIBE packet.
#[derive(Debug, Clone)]
pub struct SubscribeFilters<'a> {
    bytes: &'a [u8],
}

impl<'a> Iterator for SubscribeFilters<'a> {
    type Item = (&'a str, QoS);

    fn next(&mut self) -> Option<Self::Item> {
        let (filter, qos, rest) = split_filter(self.bytes).ok()?;
        self.bytes = rest;
        Some((filter, qos))
    }
}

#[derive(Debug, Clone, Copy)]
struct Cursor {
    pos: usize,
    end: usize,
}

impl Cursor {
    fn left(&self) -> usize {
        self.end - self.pos
    }
}

fn string_len(value: &[u8]) -> Result<u16, Error> {
    u16::try_from(value.len()).map_err(|_| Error::LengthOverflow)
}

fn split_filter(bytes: &[u8]) -> Result<(&str, QoS, &[u8]), Error> {
    if bytes.len() < 2 {
        return Err(Error::MalformedPacket);
    }
    let len = u16::from_be_bytes([bytes[0], bytes[1]]) as usize;
    let rest = &bytes[2..];
    if rest.len() < len + 1 || len == 0 {
        return Err(Error::MalformedPacket);
    }
    let filter = core::str::from_utf8(&rest[..len]).map_err(|_| Error::InvalidUtf8)?;
    // Upper six bits of the requested QoS byte are reserved.
    let qos = QoS::from_bits(rest[len]).ok_or(Error::MalformedPacket)?;
    Ok((filter, qos, &rest[len + 1..]))
}

fn check_filter_list(mut bytes: &[u8]) -> Result<(), Error> {
    if bytes.is_empty() {
        return Err(Error::MalformedPacket);
    }
    while !bytes.is_empty() {
        let (_, _, rest) = split_filter(bytes)?;
        bytes = rest;
    }
    Ok(())
}
