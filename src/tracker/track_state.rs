/// Track confidence lifecycle state.
///
/// A track starts `Tentative` and is promoted to `Confirmed` after enough
/// consecutive matches. `Confirmed` never regresses. `Lost` is terminal:
/// the track is dropped from the active set in the same frame the state is
/// entered and its id is never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrackState {
    /// Newly created, not yet confirmed. Discarded on the first miss.
    #[default]
    Tentative,
    /// Established track, emitted every frame while alive.
    Confirmed,
    /// Terminal state, removed from the active set.
    Lost,
}
