//! Wire-level constants of the structured command schema.

/// Top-level application command kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CommandType {
    ChatInput = 1,
    User = 2,
    Message = 3,
}

/// Option kinds inside a structured command schema or payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OptionType {
    SubCommand = 1,
    SubCommandGroup = 2,
    String = 3,
    Integer = 4,
    Boolean = 5,
    User = 6,
    Channel = 7,
    Role = 8,
    Mentionable = 9,
    Number = 10,
}

impl OptionType {
    /// True for the option kinds that frame a nested command path.
    pub fn is_command_frame(code: u64) -> bool {
        code == Self::SubCommand as u64 || code == Self::SubCommandGroup as u64
    }
}

/// Channel kinds reported in schemas (`channel_types`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ChannelType {
    GuildText = 0,
    Dm = 1,
    GuildVoice = 2,
}

/// Named clearance tiers. Stored as plain integers.
pub struct ClearanceLevel;

impl ClearanceLevel {
    pub const BANNED: i64 = -1;
    pub const DEFAULT: i64 = 0;
    pub const TRUSTED: i64 = 6;
    pub const ADMIN: i64 = 9;
}
