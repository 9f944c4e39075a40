//! Outbound commands, one method per client command.
//!
//! Each helper builds the payload the protocol reference prescribes and
//! hands it to [`FchatClient::send`]. Commands marked *(chatop)* or
//! *(chanop)* are rejected by the server with an `ERR` unless the
//! character holds that role; the client does not check.

use fchat_auth::TicketSource;
use fchat_protocol::{ChannelMode, IgnoreAction, Opcode, TypingStatus};
use fchat_transport::Connector;
use serde_json::{Value, json};

use crate::{FchatClient, FchatError};

type Sent = Result<(), FchatError>;

impl<S: TicketSource, C: Connector> FchatClient<S, C> {
    async fn command(&self, opcode: Opcode, payload: Value) -> Sent {
        self.send(opcode, Some(&payload)).await
    }

    // -----------------------------------------------------------------------
    // Server moderation
    // -----------------------------------------------------------------------

    /// `ACB`: bans a character's account from the server. *(chatop)*
    pub async fn server_ban(&self, character: &str) -> Sent {
        self.command(Opcode::Acb, json!({ "character": character })).await
    }

    /// `AOP`: promotes a character to chatop. *(admin)*
    pub async fn promote_chatop(&self, character: &str) -> Sent {
        self.command(Opcode::Aop, json!({ "character": character })).await
    }

    /// `AWC`: asks for a character's alts. *(chatop)*
    pub async fn request_alts(&self, character: &str) -> Sent {
        self.command(Opcode::Awc, json!({ "character": character })).await
    }

    /// `BRO`: broadcasts to everyone online. *(admin)*
    pub async fn broadcast(&self, message: &str) -> Sent {
        self.command(Opcode::Bro, json!({ "message": message })).await
    }

    /// `DOP`: demotes a chatop. *(admin)*
    pub async fn demote_chatop(&self, character: &str) -> Sent {
        self.command(Opcode::Dop, json!({ "character": character })).await
    }

    /// `KIK`: kicks a character off the server. *(chatop)*
    pub async fn server_kick(&self, character: &str) -> Sent {
        self.command(Opcode::Kik, json!({ "character": character })).await
    }

    /// `RWD`: rewards a character with a status icon. *(admin)*
    pub async fn reward_user(&self, character: &str) -> Sent {
        self.command(Opcode::Rwd, json!({ "character": character })).await
    }

    /// `TMO`: times a character out for `minutes`. *(chatop)*
    pub async fn server_timeout(&self, character: &str, minutes: u32, reason: &str) -> Sent {
        self.command(
            Opcode::Tmo,
            json!({ "character": character, "time": minutes, "reason": reason }),
        )
        .await
    }

    /// `UNB`: lifts a server ban. *(chatop)*
    pub async fn server_unban(&self, character: &str) -> Sent {
        self.command(Opcode::Unb, json!({ "character": character })).await
    }

    /// `SFC`: calls staff with a report about `character`.
    pub async fn report_issue(&self, report: &str, character: &str) -> Sent {
        self.command(
            Opcode::Sfc,
            json!({ "action": "report", "report": report, "character": character }),
        )
        .await
    }

    // -----------------------------------------------------------------------
    // Channels
    // -----------------------------------------------------------------------

    /// `CHA`: asks for the official channel list.
    pub async fn request_public_channels(&self) -> Sent {
        self.send(Opcode::Cha, None).await
    }

    /// `ORS`: asks for the open private channel list.
    pub async fn request_private_channels(&self) -> Sent {
        self.send(Opcode::Ors, None).await
    }

    /// `JCH`
    pub async fn join_channel(&self, channel: &str) -> Sent {
        self.command(Opcode::Jch, json!({ "channel": channel })).await
    }

    /// `LCH`
    pub async fn leave_channel(&self, channel: &str) -> Sent {
        self.command(Opcode::Lch, json!({ "channel": channel })).await
    }

    /// `CCR`: creates a private channel named `channel`.
    pub async fn create_private_channel(&self, channel: &str) -> Sent {
        self.command(Opcode::Ccr, json!({ "channel": channel })).await
    }

    /// `CRC`: creates an official channel. *(admin)*
    pub async fn create_official_channel(&self, channel: &str) -> Sent {
        self.command(Opcode::Crc, json!({ "channel": channel })).await
    }

    /// `KIC`: deletes a channel. *(chatop)*
    pub async fn delete_channel(&self, channel: &str) -> Sent {
        self.command(Opcode::Kic, json!({ "channel": channel })).await
    }

    /// `CDS`: changes a channel's description. *(chanop)*
    pub async fn set_channel_description(&self, channel: &str, description: &str) -> Sent {
        self.command(
            Opcode::Cds,
            json!({ "channel": channel, "description": description }),
        )
        .await
    }

    /// `CIU`: invites a character to a private channel.
    pub async fn send_channel_invite(&self, channel: &str, character: &str) -> Sent {
        self.command(Opcode::Ciu, json!({ "channel": channel, "character": character }))
            .await
    }

    /// `RMO`: sets what a channel accepts. *(chanop)*
    pub async fn set_channel_mode(&self, channel: &str, mode: ChannelMode) -> Sent {
        self.command(Opcode::Rmo, json!({ "channel": channel, "mode": mode })).await
    }

    /// `RST` with `public`: lists a private channel publicly. *(owner)*
    pub async fn set_channel_public(&self, channel: &str) -> Sent {
        self.command(Opcode::Rst, json!({ "channel": channel, "status": "public" }))
            .await
    }

    /// `RST` with `private`: unlists a channel. *(owner)*
    pub async fn set_channel_private(&self, channel: &str) -> Sent {
        self.command(Opcode::Rst, json!({ "channel": channel, "status": "private" }))
            .await
    }

    // -----------------------------------------------------------------------
    // Channel moderation
    // -----------------------------------------------------------------------

    /// `CBL`: asks for a channel's ban list. *(chanop)*
    pub async fn request_channel_ban_list(&self, channel: &str) -> Sent {
        self.command(Opcode::Cbl, json!({ "channel": channel })).await
    }

    /// `CBU`: bans a character from a channel. *(chanop)*
    pub async fn channel_ban(&self, character: &str, channel: &str) -> Sent {
        self.command(Opcode::Cbu, json!({ "character": character, "channel": channel }))
            .await
    }

    /// `CKU`: kicks a character from a channel. *(chanop)*
    pub async fn channel_kick(&self, channel: &str, character: &str) -> Sent {
        self.command(Opcode::Cku, json!({ "channel": channel, "character": character }))
            .await
    }

    /// `CTU`: times a character out of a channel for `minutes`. *(chanop)*
    pub async fn channel_timeout(&self, channel: &str, character: &str, minutes: u32) -> Sent {
        self.command(
            Opcode::Ctu,
            json!({ "channel": channel, "character": character, "length": minutes }),
        )
        .await
    }

    /// `CUB`: lifts a channel ban. *(chanop)*
    pub async fn channel_unban(&self, channel: &str, character: &str) -> Sent {
        self.command(Opcode::Cub, json!({ "channel": channel, "character": character }))
            .await
    }

    /// `COA`: promotes a character to chanop. *(chanop)*
    pub async fn promote_chanop(&self, channel: &str, character: &str) -> Sent {
        self.command(Opcode::Coa, json!({ "channel": channel, "character": character }))
            .await
    }

    /// `COL`: asks for a channel's chanop list.
    pub async fn request_chanops(&self, channel: &str) -> Sent {
        self.command(Opcode::Col, json!({ "channel": channel })).await
    }

    /// `COR`: demotes a chanop. *(chanop)*
    pub async fn demote_chanop(&self, channel: &str, character: &str) -> Sent {
        self.command(Opcode::Cor, json!({ "channel": channel, "character": character }))
            .await
    }

    /// `CSO`: hands channel ownership to `character`. *(owner)*
    pub async fn set_channel_owner(&self, channel: &str, character: &str) -> Sent {
        self.command(Opcode::Cso, json!({ "character": character, "channel": channel }))
            .await
    }

    // -----------------------------------------------------------------------
    // Messaging
    // -----------------------------------------------------------------------

    /// `MSG`
    pub async fn send_channel_message(&self, channel: &str, message: &str) -> Sent {
        self.command(Opcode::Msg, json!({ "channel": channel, "message": message }))
            .await
    }

    /// `LRP`: posts a roleplay ad.
    pub async fn send_ad(&self, channel: &str, message: &str) -> Sent {
        self.command(Opcode::Lrp, json!({ "channel": channel, "message": message }))
            .await
    }

    /// `PRI`
    pub async fn send_private_message(&self, recipient: &str, message: &str) -> Sent {
        self.command(Opcode::Pri, json!({ "recipient": recipient, "message": message }))
            .await
    }

    /// `RLL` with `dice` like `"2d6"` or `"1d20+3"`.
    pub async fn roll_dice(&self, channel: &str, dice: &str) -> Sent {
        self.command(Opcode::Rll, json!({ "channel": channel, "dice": dice })).await
    }

    /// `RLL` with `bottle`.
    pub async fn spin_bottle(&self, channel: &str) -> Sent {
        self.roll_dice(channel, "bottle").await
    }

    /// `TPN` for our own character.
    ///
    /// # Errors
    /// [`FchatError::NotConnected`] before the first `connect`.
    pub async fn set_typing_status(&self, status: TypingStatus) -> Sent {
        let character = self
            .session()
            .map(|s| s.character)
            .ok_or(FchatError::NotConnected)?;
        self.command(Opcode::Tpn, json!({ "character": character, "status": status }))
            .await
    }

    /// `STA`
    pub async fn set_status(&self, status: &str, status_message: &str) -> Sent {
        self.command(Opcode::Sta, json!({ "status": status, "statusmsg": status_message }))
            .await
    }

    // -----------------------------------------------------------------------
    // Ignore list
    // -----------------------------------------------------------------------

    async fn ignore(&self, action: IgnoreAction, character: Option<&str>) -> Sent {
        let payload = match character {
            Some(character) => json!({ "action": action, "character": character }),
            None => json!({ "action": action }),
        };
        self.command(Opcode::Ign, payload).await
    }

    /// `IGN` `add`
    pub async fn ignore_character(&self, character: &str) -> Sent {
        self.ignore(IgnoreAction::Add, Some(character)).await
    }

    /// `IGN` `delete`
    pub async fn unignore_character(&self, character: &str) -> Sent {
        self.ignore(IgnoreAction::Delete, Some(character)).await
    }

    /// `IGN` `notify`: tells `character` their message was ignored.
    pub async fn send_ignore_notification(&self, character: &str) -> Sent {
        self.ignore(IgnoreAction::Notify, Some(character)).await
    }

    /// `IGN` `list`
    pub async fn request_ignore_list(&self) -> Sent {
        self.ignore(IgnoreAction::List, None).await
    }

    // -----------------------------------------------------------------------
    // Lookups
    // -----------------------------------------------------------------------

    /// `FKS`: searches characters. `options` is sent as-is, e.g.
    /// `{"kinks": ["523"], "genders": ["Male"]}`.
    pub async fn character_search(&self, options: Value) -> Sent {
        self.command(Opcode::Fks, options).await
    }

    /// `KIN`: asks for a character's kinks.
    pub async fn request_kinks(&self, character: &str) -> Sent {
        self.command(Opcode::Kin, json!({ "character": character })).await
    }

    /// `PRO`: asks for a character's profile tags.
    pub async fn request_profile_tags(&self, character: &str) -> Sent {
        self.command(Opcode::Pro, json!({ "character": character })).await
    }

    /// `UPT`: asks for server statistics.
    pub async fn request_stats(&self) -> Sent {
        self.send(Opcode::Upt, None).await
    }

    /// `PIN`
    pub async fn ping(&self) -> Sent {
        self.send(Opcode::Pin, None).await
    }
}
