//! Compile-time constants for stick calibration, as well as the gate layout
//! used to pick the linearization fit points and sane defaults.
use core::f32::consts::PI;

use crate::helpers::XyValuePair;

/// fit order for the linearization
pub const FIT_ORDER: usize = 3;
pub const NUM_COEFFS: usize = FIT_ORDER + 1;
pub const NO_OF_NOTCHES: usize = 16;
pub const NO_OF_CALIBRATION_POINTS: usize = NO_OF_NOTCHES * 2;

/// How many points per axis are fed to the curve fit.
pub const NO_OF_FIT_POINTS: usize = 5;

/// Two smallest and two largest origin readings are dropped before averaging.
pub const NO_OF_TRIMMED_ORIGIN_POINTS: usize = 4;

/// 28 degrees; this is the max angular deflection of the stick.
pub const MAX_STICK_ANGLE: f32 = 0.4886921906;

/// A tertiary notch this close to the origin is considered skipped during calibration.
pub const NOTCH_SKIP_THRESHOLD: f32 = 0.02;

const _: () = assert!(
    NO_OF_NOTCHES > NO_OF_TRIMMED_ORIGIN_POINTS,
    "origin averaging needs more notches than trimmed points"
);

/// Ideal output for each of the fit points, from low to high.
pub const PERFECT_ANGLES: [f64; NO_OF_FIT_POINTS] =
    [27.5, 53.2537879754, 127.5, 201.7462120246, 227.5];

pub const DEFAULT_FIT_TARGETS: FitTargets = XyValuePair {
    x: PERFECT_ANGLES,
    y: PERFECT_ANGLES,
};

pub const DEFAULT_ANGLES: [f32; NO_OF_NOTCHES] = [
    0.,
    PI / 8.0,
    PI * 2. / 8.,
    PI * 3. / 8.,
    PI * 4. / 8.,
    PI * 5. / 8.,
    PI * 6. / 8.,
    PI * 7. / 8.,
    PI * 8. / 8.,
    PI * 9. / 8.,
    PI * 10. / 8.,
    PI * 11. / 8.,
    PI * 12. / 8.,
    PI * 13. / 8.,
    PI * 14. / 8.,
    PI * 15. / 8.,
];

#[rustfmt::skip]
pub const DEFAULT_CAL_POINTS_X: [f32; NO_OF_CALIBRATION_POINTS] = [
    0.3010610568,0.3603937084,// right
    0.3010903951,0.3000194135,
    0.3005567843,0.3471911134,// up right
    0.3006904343,0.3009976295,
    0.3000800899,0.300985051,// up
    0.3001020858,0.300852804,
    0.3008746305,0.2548450139,// up left
    0.3001434092,0.3012600593,
    0.3011594091,0.2400535218,// left
    0.3014621077,0.3011248469,
    0.3010860944,0.2552106305,// down left
    0.3002197989,0.3001679513,
    0.3004438517,0.300486505,// down
    0.3002766984,0.3012828579,
    0.3014959877,0.346512936,// down right
    0.3013398149,0.3007809916
];

#[rustfmt::skip]
pub const DEFAULT_CAL_POINTS_Y: [f32; NO_OF_CALIBRATION_POINTS] = [
    0.300092277, 0.3003803475,// right
    0.3002205792,0.301004752,
    0.3001241394,0.3464200104,// up right
    0.3001331245,0.3011881186,
    0.3010685972,0.3606900641,// up
    0.3001520488,0.3010662947,
    0.3008837105,0.3461478452,// up left
    0.3011732026,0.3007367683,
    0.3011345742,0.3000566197,// left
    0.3006843288,0.3009673425,
    0.3011228978,0.2547579852,// down left
    0.3011177285,0.301264851,
    0.3002376991,0.2403885431,// down
    0.3006540818,0.3010588401,
    0.3011093054,0.2555000655,// down right
    0.3000802760,0.3008482317
];

/// Target ordinates for the fit, one set per axis.
pub type FitTargets = XyValuePair<[f64; NO_OF_FIT_POINTS]>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// A fit source refers to a notch the stick doesn't have.
    NotchOutOfRange { notch: usize, num_notches: usize },
    /// Two fit positions on the same axis read the same data, the fit would be degenerate.
    DuplicateSource { position: FitPosition },
    /// Not enough origin readings left over after trimming outliers.
    NotEnoughOriginPoints { available: usize },
}

/// Logical position of a fit point along one axis, low to high.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FitPosition {
    Low,
    LowDiagonal,
    Center,
    HighDiagonal,
    High,
}

impl FitPosition {
    pub const ALL: [FitPosition; NO_OF_FIT_POINTS] = [
        FitPosition::Low,
        FitPosition::LowDiagonal,
        FitPosition::Center,
        FitPosition::HighDiagonal,
        FitPosition::High,
    ];
}

/// Where a fit point is read from. Notch indices are 0-based, i.e. notch `n`
/// lives at index `n + 1` of the cleaned points.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FitSource {
    Origin,
    Notch(usize),
    /// Mean of two notches, used for the diagonals.
    NotchPair(usize, usize),
}

impl FitSource {
    /// Read this source out of the cleaned points. A notch the stick doesn't
    /// have reads as NaN, which carries through the fit.
    pub fn read(&self, cleaned_points: &[f32; NO_OF_NOTCHES + 1]) -> f64 {
        let notch = |n: usize| {
            cleaned_points[1..]
                .get(n)
                .map_or(f64::NAN, |point| *point as f64)
        };

        match *self {
            FitSource::Origin => cleaned_points[0] as f64,
            FitSource::Notch(n) => notch(n),
            FitSource::NotchPair(a, b) => (notch(a) + notch(b)) / 2.0f64,
        }
    }

    fn highest_notch(&self) -> Option<usize> {
        match *self {
            FitSource::Origin => None,
            FitSource::Notch(n) => Some(n),
            FitSource::NotchPair(a, b) => Some(a.max(b)),
        }
    }

    /// A pair of the same notch is just that notch.
    fn normalized(&self) -> FitSource {
        match *self {
            FitSource::NotchPair(a, b) if a == b => FitSource::Notch(a),
            source => source,
        }
    }

    fn same_data(&self, other: &FitSource) -> bool {
        match (self.normalized(), other.normalized()) {
            (FitSource::NotchPair(a, b), FitSource::NotchPair(c, d)) => {
                (a == c && b == d) || (a == d && b == c)
            }
            (a, b) => a == b,
        }
    }
}

/// Maps every [`FitPosition`] of each axis to the notch(es) it is read from.
/// Entries are in [`FitPosition::ALL`] order.
///
/// Only [`GateLayout::new`] and [`DEFAULT_GATE_LAYOUT`] produce one, so every
/// layout in use has been checked against [`NO_OF_NOTCHES`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct GateLayout {
    x: [FitSource; NO_OF_FIT_POINTS],
    y: [FitSource; NO_OF_FIT_POINTS],
}

/// Notches are numbered counterclockwise, starting at 3 o'clock.
pub const DEFAULT_GATE_LAYOUT: GateLayout = GateLayout {
    x: [
        FitSource::Notch(8),         // left
        FitSource::NotchPair(6, 10), // left diagonals
        FitSource::Origin,
        FitSource::NotchPair(2, 14), // right diagonals
        FitSource::Notch(0),         // right
    ],
    y: [
        FitSource::Notch(12),         // down
        FitSource::NotchPair(10, 14), // down diagonals
        FitSource::Origin,
        FitSource::NotchPair(6, 2), // up diagonals
        FitSource::Notch(4),        // up
    ],
};

impl Default for GateLayout {
    fn default() -> Self {
        DEFAULT_GATE_LAYOUT
    }
}

impl GateLayout {
    pub fn new(
        x: [FitSource; NO_OF_FIT_POINTS],
        y: [FitSource; NO_OF_FIT_POINTS],
    ) -> Result<Self, ConfigError> {
        let layout = Self { x, y };
        layout.validate(NO_OF_NOTCHES)?;

        Ok(layout)
    }

    pub fn source(&self, axis: Axis, position: FitPosition) -> FitSource {
        let sources = match axis {
            Axis::X => &self.x,
            Axis::Y => &self.y,
        };

        sources[position as usize]
    }

    /// Make sure every source exists on a stick with `num_notches` notches
    /// and no axis samples the same data twice.
    pub fn validate(&self, num_notches: usize) -> Result<(), ConfigError> {
        if num_notches <= NO_OF_TRIMMED_ORIGIN_POINTS {
            return Err(ConfigError::NotEnoughOriginPoints {
                available: num_notches,
            });
        }

        for sources in [&self.x, &self.y] {
            for (i, source) in sources.iter().enumerate() {
                if let Some(notch) = source.highest_notch() {
                    if notch >= num_notches {
                        return Err(ConfigError::NotchOutOfRange { notch, num_notches });
                    }
                }

                if sources[..i].iter().any(|other| other.same_data(source)) {
                    return Err(ConfigError::DuplicateSource {
                        position: FitPosition::ALL[i],
                    });
                }
            }
        }

        Ok(())
    }

    /// Pick the fit abscissas for both axes out of the cleaned points.
    pub fn select_fit_points(
        &self,
        cleaned_points_x: &[f32; NO_OF_NOTCHES + 1],
        cleaned_points_y: &[f32; NO_OF_NOTCHES + 1],
    ) -> XyValuePair<[f64; NO_OF_FIT_POINTS]> {
        XyValuePair {
            x: FitPosition::ALL.map(|p| self.source(Axis::X, p).read(cleaned_points_x)),
            y: FitPosition::ALL.map(|p| self.source(Axis::Y, p).read(cleaned_points_y)),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Axis {
    X,
    Y,
}
