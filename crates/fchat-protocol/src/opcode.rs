//! The closed set of protocol opcodes.
//!
//! Every command the chat server can send, and every command a client can
//! send, is a three-letter uppercase code. Many codes travel in both
//! directions with different payloads (`MSG` is "send a message" going
//! out and "someone sent a message" coming in), so there is one enum for
//! both and [`Opcode::direction`] says which way a code may flow.

use std::fmt;
use std::str::FromStr;

use crate::ProtocolError;

/// Which side of the connection may send a given opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Only the server sends it.
    Inbound,
    /// Only the client sends it.
    Outbound,
    /// Both sides use it.
    Both,
}

impl Direction {
    /// Returns `true` if the server may send this code.
    pub fn is_inbound(self) -> bool {
        matches!(self, Self::Inbound | Self::Both)
    }

    /// Returns `true` if the client may send this code.
    pub fn is_outbound(self) -> bool {
        matches!(self, Self::Outbound | Self::Both)
    }
}

/// A protocol command code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Opcode {
    /// Server ban (chatop).
    Acb,
    /// Full chatop list.
    Adl,
    /// Promote to chatop.
    Aop,
    /// Alt character lookup.
    Awc,
    /// Broadcast to everyone.
    Bro,
    /// Channel ban list.
    Cbl,
    /// Channel ban.
    Cbu,
    /// Create private channel.
    Ccr,
    /// Channel description.
    Cds,
    /// Public channel list.
    Cha,
    /// Channel invite.
    Ciu,
    /// Channel kick.
    Cku,
    /// Promote to chanop.
    Coa,
    /// Chanop list.
    Col,
    /// Connected user count.
    Con,
    /// Demote chanop.
    Cor,
    /// Create official channel.
    Crc,
    /// Set channel owner.
    Cso,
    /// Channel timeout.
    Ctu,
    /// Channel unban.
    Cub,
    /// Demote chatop.
    Dop,
    /// Server error report.
    Err,
    /// Character search.
    Fks,
    /// Character went offline.
    Fln,
    /// Friends list.
    Frl,
    /// Server hello.
    Hlo,
    /// Initial channel data.
    Ich,
    /// Identify.
    Idn,
    /// Ignore list operations.
    Ign,
    /// Join channel.
    Jch,
    /// Delete channel.
    Kic,
    /// Kink data.
    Kid,
    /// Server kick.
    Kik,
    /// Kink request.
    Kin,
    /// Leave channel.
    Lch,
    /// Initial online character list.
    Lis,
    /// Roleplay ad.
    Lrp,
    /// Channel message.
    Msg,
    /// Character came online.
    Nln,
    /// Open private rooms list.
    Ors,
    /// Keepalive ping.
    Pin,
    /// Profile data.
    Prd,
    /// Private message.
    Pri,
    /// Profile request.
    Pro,
    /// Reload server config.
    Rld,
    /// Dice roll or bottle spin.
    Rll,
    /// Room mode.
    Rmo,
    /// Room status (public/private).
    Rst,
    /// Real-time bridge notification.
    Rtb,
    /// Reward user.
    Rwd,
    /// Staff call / report.
    Sfc,
    /// Status change.
    Sta,
    /// System message.
    Sys,
    /// Server timeout.
    Tmo,
    /// Typing notification.
    Tpn,
    /// Server unban.
    Unb,
    /// Uptime / statistics.
    Upt,
    /// Server variable.
    Var,
}

impl Opcode {
    /// Every opcode, in alphabetical order.
    pub const ALL: [Opcode; 58] = [
        Self::Acb, Self::Adl, Self::Aop, Self::Awc, Self::Bro, Self::Cbl,
        Self::Cbu, Self::Ccr, Self::Cds, Self::Cha, Self::Ciu, Self::Cku,
        Self::Coa, Self::Col, Self::Con, Self::Cor, Self::Crc, Self::Cso,
        Self::Ctu, Self::Cub, Self::Dop, Self::Err, Self::Fks, Self::Fln,
        Self::Frl, Self::Hlo, Self::Ich, Self::Idn, Self::Ign, Self::Jch,
        Self::Kic, Self::Kid, Self::Kik, Self::Kin, Self::Lch, Self::Lis,
        Self::Lrp, Self::Msg, Self::Nln, Self::Ors, Self::Pin, Self::Prd,
        Self::Pri, Self::Pro, Self::Rld, Self::Rll, Self::Rmo, Self::Rst,
        Self::Rtb, Self::Rwd, Self::Sfc, Self::Sta, Self::Sys, Self::Tmo,
        Self::Tpn, Self::Unb, Self::Upt, Self::Var,
    ];

    /// The three-letter wire form.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Acb => "ACB",
            Self::Adl => "ADL",
            Self::Aop => "AOP",
            Self::Awc => "AWC",
            Self::Bro => "BRO",
            Self::Cbl => "CBL",
            Self::Cbu => "CBU",
            Self::Ccr => "CCR",
            Self::Cds => "CDS",
            Self::Cha => "CHA",
            Self::Ciu => "CIU",
            Self::Cku => "CKU",
            Self::Coa => "COA",
            Self::Col => "COL",
            Self::Con => "CON",
            Self::Cor => "COR",
            Self::Crc => "CRC",
            Self::Cso => "CSO",
            Self::Ctu => "CTU",
            Self::Cub => "CUB",
            Self::Dop => "DOP",
            Self::Err => "ERR",
            Self::Fks => "FKS",
            Self::Fln => "FLN",
            Self::Frl => "FRL",
            Self::Hlo => "HLO",
            Self::Ich => "ICH",
            Self::Idn => "IDN",
            Self::Ign => "IGN",
            Self::Jch => "JCH",
            Self::Kic => "KIC",
            Self::Kid => "KID",
            Self::Kik => "KIK",
            Self::Kin => "KIN",
            Self::Lch => "LCH",
            Self::Lis => "LIS",
            Self::Lrp => "LRP",
            Self::Msg => "MSG",
            Self::Nln => "NLN",
            Self::Ors => "ORS",
            Self::Pin => "PIN",
            Self::Prd => "PRD",
            Self::Pri => "PRI",
            Self::Pro => "PRO",
            Self::Rld => "RLD",
            Self::Rll => "RLL",
            Self::Rmo => "RMO",
            Self::Rst => "RST",
            Self::Rtb => "RTB",
            Self::Rwd => "RWD",
            Self::Sfc => "SFC",
            Self::Sta => "STA",
            Self::Sys => "SYS",
            Self::Tmo => "TMO",
            Self::Tpn => "TPN",
            Self::Unb => "UNB",
            Self::Upt => "UPT",
            Self::Var => "VAR",
        }
    }

    /// Which side of the connection may send this code.
    pub fn direction(self) -> Direction {
        match self {
            Self::Adl
            | Self::Con
            | Self::Err
            | Self::Fln
            | Self::Frl
            | Self::Hlo
            | Self::Ich
            | Self::Kid
            | Self::Lis
            | Self::Nln
            | Self::Prd
            | Self::Rtb
            | Self::Sys
            | Self::Var => Direction::Inbound,

            Self::Acb
            | Self::Awc
            | Self::Cbl
            | Self::Ccr
            | Self::Crc
            | Self::Cub
            | Self::Kic
            | Self::Kik
            | Self::Kin
            | Self::Pro
            | Self::Rld
            | Self::Rst
            | Self::Rwd
            | Self::Tmo
            | Self::Unb => Direction::Outbound,

            _ => Direction::Both,
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Opcode {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, ProtocolError> {
        Self::ALL
            .iter()
            .copied()
            .find(|op| op.as_str() == s)
            .ok_or_else(|| {
                ProtocolError::InvalidFrame(format!("unknown opcode {s:?}"))
            })
    }
}
