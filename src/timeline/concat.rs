use crate::foundation::error::{MontageError, MontageResult};
use crate::timeline::model::{Clip, Concatenation, Timeline};

/// One input to [`concatenate`]: a clip, or an existing concatenation to splice in.
#[derive(Clone, Debug)]
pub enum ConcatSource {
    Clip(Clip),
    Concat(Concatenation),
}

impl From<Clip> for ConcatSource {
    fn from(c: Clip) -> Self {
        Self::Clip(c)
    }
}

impl From<Concatenation> for ConcatSource {
    fn from(c: Concatenation) -> Self {
        Self::Concat(c)
    }
}

/// Join clips end to end into a lazy [`Timeline::Concat`].
///
/// Nested concatenations are flattened first. Clips with no resolvable source or a
/// non-positive play duration are dropped. Size, frame rate and codec hints come from the
/// first surviving clip.
#[tracing::instrument(skip(sources))]
pub fn concatenate<I, S>(sources: I) -> MontageResult<Timeline>
where
    I: IntoIterator<Item = S>,
    S: Into<ConcatSource>,
{
    let mut seen = 0usize;
    let mut clips = Vec::new();
    for source in sources {
        seen += 1;
        match source.into() {
            ConcatSource::Concat(nested) => clips.extend(nested.clips),
            ConcatSource::Clip(clip) => {
                if clip.is_resolvable() && clip.play_duration() > 0.0 {
                    clips.push(clip);
                } else {
                    tracing::warn!(source = ?clip.source, "dropping unresolvable clip from concatenation");
                }
            }
        }
    }
    if seen == 0 {
        return Err(MontageError::configuration(
            "no clips provided for concatenation",
        ));
    }
    let Some(first) = clips.first() else {
        return Err(MontageError::configuration(
            "no valid clips to concatenate",
        ));
    };

    let joined = Concatenation {
        duration: clips.iter().map(Clip::play_duration).sum(),
        width: first.width,
        height: first.height,
        fps: first.fps,
        codec: first.codec.clone(),
        pixel_format: first.pixel_format.clone(),
        bit_rate: first.bit_rate,
        has_audio: clips.iter().any(Clip::has_audio),
        clips,
    };
    tracing::debug!(
        clips = joined.clips.len(),
        duration = joined.duration,
        "built concatenation"
    );
    Ok(Timeline::Concat(joined))
}

impl Concatenation {
    /// `true` for a single member with no trim and no filters: a plain stream copy.
    pub fn is_passthrough(&self) -> bool {
        match self.clips.as_slice() {
            [only] => only.trim.is_none() && !only.has_filters() && only.source.path().is_some(),
            _ => false,
        }
    }

    /// Expected frame count at the first member's rate.
    pub fn frame_count(&self) -> u64 {
        (f64::from(self.fps) * self.duration).round().max(0.0) as u64
    }
}

#[cfg(test)]
#[path = "../../tests/unit/timeline/concat.rs"]
mod tests;
