//! Marker types.

/// Marker type describing an entity creation.
#[derive(Clone, Copy, Debug)]
pub struct Creation;

/// Marker type describing an entity confirmation.
#[derive(Clone, Copy, Debug)]
pub struct Confirmation;

/// Marker type describing a start of an entity activity.
#[derive(Clone, Copy, Debug)]
pub struct Start;

/// Marker type describing an entity completion.
#[derive(Clone, Copy, Debug)]
pub struct Completion;

/// Marker type describing an entity cancellation.
#[derive(Clone, Copy, Debug)]
pub struct Cancellation;

/// Marker type describing an entity being declined.
#[derive(Clone, Copy, Debug)]
pub struct Decline;

/// Marker type describing an entity publication.
#[derive(Clone, Copy, Debug)]
pub struct Publication;

/// Marker type describing an entity being flagged.
#[derive(Clone, Copy, Debug)]
pub struct Flag;

/// Marker type describing an entity becoming immutable.
#[derive(Clone, Copy, Debug)]
pub struct Lock;

/// Marker type describing a release of a held value.
#[derive(Clone, Copy, Debug)]
pub struct Release;
