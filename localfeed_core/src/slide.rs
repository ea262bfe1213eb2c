// Copyright 2026 the LocalFeed Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Slide registry and per-slide content state.
//!
//! The registry is the ordered `index → media id` table for the current feed
//! mode, plus the [`LoadState`] of each slide. It is rebuilt wholesale on mode
//! switch; each rebuild advances the registry epoch so that callbacks tied to
//! the previous slide set can be told apart.

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use crate::media::{MediaKind, classify};

/// Content state of a slide.
///
/// Legal transitions are `Empty → Loading`, `Loading → Loaded`,
/// `Loading → Errored`, and the two abort paths `Loading → Empty` and
/// `Loaded → Empty`. `Errored` is terminal until the next rebuild.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum LoadState {
    /// No source attached.
    #[default]
    Empty,
    /// A source is attached and the transfer has not settled.
    Loading,
    /// The content is decoded and resident.
    Loaded,
    /// The content failed to load; an error indicator is shown.
    Errored,
}

impl LoadState {
    /// Returns `true` if `self → next` is a legal transition.
    #[must_use]
    pub const fn can_become(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Empty, Self::Loading)
                | (Self::Loading, Self::Loaded | Self::Errored | Self::Empty)
                | (Self::Loaded, Self::Empty)
        )
    }

    /// Returns `true` if content has been attached (anything but `Empty`).
    #[inline]
    #[must_use]
    pub const fn is_populated(self) -> bool {
        !matches!(self, Self::Empty)
    }
}

/// Error returned by [`SlideRegistry::transition`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransitionError {
    /// No slide exists at the index.
    NoSlide {
        /// The requested index.
        index: usize,
    },
    /// The transition is not in the legal set.
    Illegal {
        /// The slide index.
        index: usize,
        /// Current state.
        from: LoadState,
        /// Requested state.
        to: LoadState,
    },
}

impl fmt::Display for TransitionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoSlide { index } => write!(f, "no slide at index {index}"),
            Self::Illegal { index, from, to } => {
                write!(f, "slide {index}: illegal transition {from:?} -> {to:?}")
            }
        }
    }
}

impl core::error::Error for TransitionError {}

/// One slot of the feed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Slide {
    index: usize,
    media_id: String,
    load_state: LoadState,
}

impl Slide {
    /// Position of the slide in the feed.
    #[inline]
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    /// The media identifier, as handed out by the server.
    #[inline]
    #[must_use]
    pub fn media_id(&self) -> &str {
        &self.media_id
    }

    /// The media kind, derived from the identifier on every call.
    #[must_use]
    pub fn kind(&self) -> MediaKind {
        classify(&self.media_id)
    }

    /// Current content state.
    #[inline]
    #[must_use]
    pub fn load_state(&self) -> LoadState {
        self.load_state
    }
}

/// Ordered table of slides for the current feed mode.
#[derive(Clone, Debug, Default)]
pub struct SlideRegistry {
    slides: Vec<Slide>,
    epoch: u64,
}

impl SlideRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces every slide, all starting `Empty`, and advances the epoch.
    pub fn rebuild<I, T>(&mut self, media_ids: I)
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.slides.clear();
        self.slides
            .extend(media_ids.into_iter().enumerate().map(|(index, id)| Slide {
                index,
                media_id: id.into(),
                load_state: LoadState::Empty,
            }));
        self.epoch += 1;
    }

    /// Number of rebuilds so far.
    #[inline]
    #[must_use]
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Number of slides.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.slides.len()
    }

    /// Returns `true` if there are no slides.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slides.is_empty()
    }

    /// Returns the slide at `index`.
    #[inline]
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Slide> {
        self.slides.get(index)
    }

    /// Returns the content state at `index`, if the slide exists.
    #[must_use]
    pub fn state(&self, index: usize) -> Option<LoadState> {
        self.get(index).map(Slide::load_state)
    }

    /// Iterates slides in feed order.
    pub fn iter(&self) -> impl Iterator<Item = &Slide> {
        self.slides.iter()
    }

    /// Moves the slide at `index` to `to`, returning its previous state.
    pub fn transition(&mut self, index: usize, to: LoadState) -> Result<LoadState, TransitionError> {
        let slide = self
            .slides
            .get_mut(index)
            .ok_or(TransitionError::NoSlide { index })?;
        let from = slide.load_state;
        if !from.can_become(to) {
            return Err(TransitionError::Illegal { index, from, to });
        }
        slide.load_state = to;
        Ok(from)
    }
}
