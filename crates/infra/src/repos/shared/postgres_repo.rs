use anniv_scheduler_domain::{ReminderChannel, ID};
use sqlx::types::Uuid;
use std::convert::TryFrom;
use tracing::warn;

/// Helpers shared by the postgres repositories

pub fn uuids(ids: &[ID]) -> Vec<Uuid> {
    ids.iter().map(|id| *id.inner_ref()).collect()
}

pub fn channel_codes(channels: &[ReminderChannel]) -> Vec<i16> {
    channels.iter().map(|channel| channel.code()).collect()
}

pub fn channels_from_codes(codes: &[i16]) -> anyhow::Result<Vec<ReminderChannel>> {
    codes
        .iter()
        .map(|code| ReminderChannel::try_from(*code).map_err(anyhow::Error::from))
        .collect()
}

/// Decodes every row that can be decoded. A row that cannot is logged with
/// its uid and left out, so it never hides the rows next to it.
pub fn decode_rows<R, T>(raws: Vec<R>, entity: &str, uid: impl Fn(&R) -> Uuid) -> Vec<T>
where
    T: TryFrom<R, Error = anyhow::Error>,
{
    raws.into_iter()
        .filter_map(|raw| {
            let row_uid = uid(&raw);
            match T::try_from(raw) {
                Ok(decoded) => Some(decoded),
                Err(e) => {
                    warn!("Skipping unreadable {} {}. Error: {:?}", entity, row_uid, e);
                    None
                }
            }
        })
        .collect()
}
