use std::ops::RangeInclusive;

/// What has to be drawn to bring the canvas from the last rendered frame to
/// the current one.
///
/// Frames are layers: each one is drawn over everything before it without
/// clearing, so moving forward only needs the new layers while moving back
/// (a loop wrap or a backward seek) needs a rebuild from frame 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderRegion {
    Unchanged,
    /// Draw these frames, in order, over the existing canvas.
    Incremental(RangeInclusive<usize>),
    /// Clear to the background color, then draw these frames in order.
    FullRedraw(RangeInclusive<usize>),
}

impl RenderRegion {
    pub fn clears_canvas(&self) -> bool {
        matches!(self, RenderRegion::FullRedraw(_))
    }

    pub fn frames(&self) -> Option<RangeInclusive<usize>> {
        match self {
            RenderRegion::Unchanged => None,
            RenderRegion::Incremental(range) | RenderRegion::FullRedraw(range) => {
                Some(range.clone())
            }
        }
    }
}

/// `last_rendered` is `None` until something has been drawn; that first draw
/// starts from a cleared canvas.
pub fn plan_render(last_rendered: Option<usize>, current: usize) -> RenderRegion {
    match last_rendered {
        None => RenderRegion::FullRedraw(0..=current),
        Some(last) if last < current => RenderRegion::Incremental(last + 1..=current),
        Some(last) if last > current => RenderRegion::FullRedraw(0..=current),
        Some(_) => RenderRegion::Unchanged,
    }
}
