//! Test assertions for channel verification.

use std::fmt::Debug;

use crate::{
    ChannelPhase, RendezvousError, RendezvousService, RendezvousTransport, Result, VerificationCode,
};

/// Assert that a check code has three groups of four digits in the range the
/// derivation can produce.
///
/// # Panics
/// Panics if the code is malformed.
pub fn assert_code_format(code: &VerificationCode) {
    let rendered = code.to_string();
    let groups: Vec<&str> = rendered.split('-').collect();
    assert_eq!(groups.len(), 3, "Check code should have 3 groups: {rendered}");

    for group in groups {
        assert_eq!(group.len(), 4, "Group should have 4 digits: {rendered}");
        let value: u16 = group
            .parse()
            .unwrap_or_else(|_| panic!("Group should be numeric: {rendered}"));
        assert!(
            (1000..=9191).contains(&value),
            "Group out of range: {rendered}"
        );
    }
}

/// Assert that both ends of a handshake agree on key and check code.
///
/// # Panics
/// Panics if either side is not established or the two sides disagree.
pub fn assert_channel_established<A, B>(
    creator: &RendezvousService<A>,
    joiner: &RendezvousService<B>,
    creator_code: &VerificationCode,
    joiner_code: &VerificationCode,
) where
    A: RendezvousTransport,
    B: RendezvousTransport,
{
    assert_eq!(creator.phase(), ChannelPhase::Established);
    assert_eq!(joiner.phase(), ChannelPhase::Established);
    assert_eq!(creator_code, joiner_code, "Check codes should match");
    assert_code_format(creator_code);

    let key = creator.symmetric_key();
    assert!(key.is_some(), "Creator should hold a channel key");
    assert_eq!(key, joiner.symmetric_key(), "Channel keys should match");

    assert_eq!(creator.public_key(), joiner.interlocutor_public_key());
    assert_eq!(joiner.public_key(), creator.interlocutor_public_key());
}

/// Assert that an operation was refused because the channel is not ready.
///
/// # Panics
/// Panics on success or on any other error.
pub fn assert_not_ready<T: Debug>(result: &Result<T>) {
    match result {
        Err(RendezvousError::ChannelNotReady) => {}
        other => panic!("Expected ChannelNotReady, got {other:?}"),
    }
}
