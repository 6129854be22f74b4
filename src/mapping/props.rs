//! MAPI property identifiers read by the mapper.

/// PidTagImportance
pub const IMPORTANCE: u16 = 0x0017;
/// PidTagMessageClass
pub const MESSAGE_CLASS: u16 = 0x001a;
/// PidTagSubject
pub const SUBJECT: u16 = 0x0037;
/// PidTagClientSubmitTime
pub const CLIENT_SUBMIT_TIME: u16 = 0x0039;
/// PidTagTransportMessageHeaders
pub const TRANSPORT_MESSAGE_HEADERS: u16 = 0x007d;
/// PidTagRecipientType
pub const RECIPIENT_TYPE: u16 = 0x0c15;
/// PidTagSenderName
pub const SENDER_NAME: u16 = 0x0c1a;
/// PidTagSenderEmailAddress
pub const SENDER_EMAIL_ADDRESS: u16 = 0x0c1f;
/// PidTagMessageDeliveryTime
pub const MESSAGE_DELIVERY_TIME: u16 = 0x0e06;
/// PidTagMessageFlags
pub const MESSAGE_FLAGS: u16 = 0x0e07;
/// PidTagAttachSize
pub const ATTACH_SIZE: u16 = 0x0e20;
/// PidTagFlagStatus
pub const FLAG_STATUS: u16 = 0x1090;
/// PidTagDisplayName
pub const DISPLAY_NAME: u16 = 0x3001;
/// PidTagEmailAddress
pub const EMAIL_ADDRESS: u16 = 0x3003;
/// PidTagAttachFilename (8.3)
pub const ATTACH_FILENAME: u16 = 0x3704;
/// PidTagAttachLongFilename
pub const ATTACH_LONG_FILENAME: u16 = 0x3707;
/// PidTagPrimarySmtpAddress
pub const PRIMARY_SMTP_ADDRESS: u16 = 0x39fe;
/// PidTagSenderSmtpAddress
pub const SENDER_SMTP_ADDRESS: u16 = 0x5d01;

/// `MSGFLAG_READ` bit of PidTagMessageFlags.
pub const MSGFLAG_READ: i64 = 0x1;

/// PidTagRecipientType values.
pub const MAPI_TO: i64 = 1;
pub const MAPI_CC: i64 = 2;
pub const MAPI_BCC: i64 = 3;
