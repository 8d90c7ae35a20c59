/// Holds one value per stick axis.
#[derive(Debug, Clone, Default, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct XyValuePair<T> {
    pub x: T,
    pub y: T,
}

impl<T> XyValuePair<T> {
    /// Apply the same transformation to both axes.
    pub fn map<U>(self, mut f: impl FnMut(T) -> U) -> XyValuePair<U> {
        XyValuePair {
            x: f(self.x),
            y: f(self.y),
        }
    }
}
