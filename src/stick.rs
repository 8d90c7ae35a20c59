// vast majority of this is taken from Phob firmware

use libm::{atan2f, cosf, roundf, sinf, sqrtf};

use crate::{
    config::{
        ConfigError, FitTargets, GateLayout, DEFAULT_GATE_LAYOUT, MAX_STICK_ANGLE,
        NOTCH_SKIP_THRESHOLD, NO_OF_CALIBRATION_POINTS, NO_OF_FIT_POINTS, NO_OF_NOTCHES,
        NO_OF_TRIMMED_ORIGIN_POINTS, NUM_COEFFS,
    },
    curve_fit::{CurveFitter, LeastSquaresFit},
    helpers::XyValuePair,
};

const TWO_PI: f32 = core::f32::consts::PI * 2.;

pub const NOTCH_STATUS_DEFAULTS: [NotchStatus; NO_OF_NOTCHES] = [
    NotchStatus::Cardinal,
    NotchStatus::TertActive,
    NotchStatus::Secondary,
    NotchStatus::TertActive,
    NotchStatus::Cardinal,
    NotchStatus::TertActive,
    NotchStatus::Secondary,
    NotchStatus::TertActive,
    NotchStatus::Cardinal,
    NotchStatus::TertActive,
    NotchStatus::Secondary,
    NotchStatus::TertActive,
    NotchStatus::Cardinal,
    NotchStatus::TertActive,
    NotchStatus::Secondary,
    NotchStatus::TertActive,
];

#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StickParams {
    // these are the linearization coefficients
    pub fit_coeffs_x: [f32; NUM_COEFFS],
    pub fit_coeffs_y: [f32; NUM_COEFFS],
}

impl StickParams {
    /// Store the coefficients of a finished linearization, each axis in its own slot.
    pub fn apply_linearization(&mut self, linearized: &LinearizedCalibration) {
        self.fit_coeffs_x = linearized.fit_coeffs_x.map(|e| e as f32);
        self.fit_coeffs_y = linearized.fit_coeffs_y.map(|e| e as f32);
    }

    /// Linearize a raw stick reading with the stored coefficients.
    pub fn linearize_xy(&self, x: f32, y: f32) -> (f32, f32) {
        (
            linearize(x, &self.fit_coeffs_x),
            linearize(y, &self.fit_coeffs_y),
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum NotchStatus {
    TertInactive,
    TertActive,
    Secondary,
    Cardinal,
}

/// The two most extreme values of a series, most extreme first.
///
/// A new value only displaces a slot if it strictly beats it, so on ties the
/// value seen first keeps its place.
#[derive(Clone, Copy, Debug)]
struct ExtremeWindow {
    beats: fn(f32, f32) -> bool,
    slots: [Option<(usize, f32)>; 2],
}

impl ExtremeWindow {
    fn smallest() -> Self {
        Self {
            beats: |a, b| a < b,
            slots: [None; 2],
        }
    }

    fn largest() -> Self {
        Self {
            beats: |a, b| a > b,
            slots: [None; 2],
        }
    }

    fn push(&mut self, index: usize, value: f32) {
        let entry = Some((index, value));
        let slots = self.slots;

        match slots {
            [None, _] => self.slots[0] = entry,
            [Some((_, most)), _] if (self.beats)(value, most) => {
                self.slots[1] = self.slots[0];
                self.slots[0] = entry;
            }
            [_, None] => self.slots[1] = entry,
            [_, Some((_, next))] if (self.beats)(value, next) => self.slots[1] = entry,
            _ => {}
        }
    }

    fn sum(&self) -> f32 {
        self.slots.iter().flatten().map(|(_, value)| value).sum()
    }
}

/// Average of `origin_points` without the two smallest and two largest values.
pub fn trimmed_origin_mean(origin_points: &[f32]) -> Result<f32, ConfigError> {
    if origin_points.len() <= NO_OF_TRIMMED_ORIGIN_POINTS {
        return Err(ConfigError::NotEnoughOriginPoints {
            available: origin_points.len(),
        });
    }

    Ok(trimmed_mean(origin_points))
}

fn trimmed_mean(origin_points: &[f32]) -> f32 {
    let mut smallest = ExtremeWindow::smallest();
    let mut largest = ExtremeWindow::largest();
    let mut sum = 0f32;

    for (i, value) in origin_points.iter().copied().enumerate() {
        sum += value;
        smallest.push(i, value);
        largest.push(i, value);
    }

    trace!(
        "Trimming origin points {} and {}",
        smallest.slots,
        largest.slots
    );

    (sum - smallest.sum() - largest.sum())
        / (origin_points.len() - NO_OF_TRIMMED_ORIGIN_POINTS) as f32
}

/// Reduce the raw calibration points to an averaged origin followed by the notch points.
///
/// Index 0 of each output is the origin, averaged over all origin readings
/// with the outliers removed. Indices `1..=NO_OF_NOTCHES` are the notch
/// readings in the order they were taken.
pub fn clean_cal_points(
    raw_cal_points_x: &[f32; NO_OF_CALIBRATION_POINTS],
    raw_cal_points_y: &[f32; NO_OF_CALIBRATION_POINTS],
) -> ([f32; NO_OF_NOTCHES + 1], [f32; NO_OF_NOTCHES + 1]) {
    let mut cleaned_points_x = [0f32; NO_OF_NOTCHES + 1];
    let mut cleaned_points_y = [0f32; NO_OF_NOTCHES + 1];

    for i in 0..NO_OF_NOTCHES {
        // copy the cal point into the cleaned list
        cleaned_points_x[i + 1] = raw_cal_points_x[i * 2 + 1];
        cleaned_points_y[i + 1] = raw_cal_points_y[i * 2 + 1];
    }

    let origins_x: [f32; NO_OF_NOTCHES] = core::array::from_fn(|i| raw_cal_points_x[i * 2]);
    let origins_y: [f32; NO_OF_NOTCHES] = core::array::from_fn(|i| raw_cal_points_y[i * 2]);

    cleaned_points_x[0] = trimmed_mean(&origins_x);
    cleaned_points_y[0] = trimmed_mean(&origins_y);

    (cleaned_points_x, cleaned_points_y)
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CleanedCalibrationPoints {
    pub cleaned_points_x: [f32; NO_OF_NOTCHES + 1],
    pub cleaned_points_y: [f32; NO_OF_NOTCHES + 1],
    pub notch_points_x: [f32; NO_OF_NOTCHES + 1],
    pub notch_points_y: [f32; NO_OF_NOTCHES + 1],
    pub notch_status: [NotchStatus; NO_OF_NOTCHES],
}

impl Default for CleanedCalibrationPoints {
    fn default() -> Self {
        Self {
            cleaned_points_x: [0f32; NO_OF_NOTCHES + 1],
            cleaned_points_y: [0f32; NO_OF_NOTCHES + 1],
            notch_points_x: [0f32; NO_OF_NOTCHES + 1],
            notch_points_y: [0f32; NO_OF_NOTCHES + 1],
            notch_status: NOTCH_STATUS_DEFAULTS,
        }
    }
}

impl CleanedCalibrationPoints {
    pub fn from_temp_calibration_points(
        cal_points_x: &[f32; NO_OF_CALIBRATION_POINTS],
        cal_points_y: &[f32; NO_OF_CALIBRATION_POINTS],
        notch_angles: &[f32; NO_OF_NOTCHES],
    ) -> Self {
        let mut out = Self::default();

        debug!("Raw calibration points:");
        for i in 0..NO_OF_CALIBRATION_POINTS {
            debug!("({}, {})", cal_points_x[i], cal_points_y[i])
        }

        debug!("Notch angles: {}", notch_angles);

        (out.cleaned_points_x, out.cleaned_points_y) =
            clean_cal_points(cal_points_x, cal_points_y);

        for i in 0..NO_OF_NOTCHES {
            (out.notch_points_x[i + 1], out.notch_points_y[i + 1]) =
                match calc_stick_values(notch_angles[i]) {
                    (a, b) => (roundf(a), roundf(b)),
                };
        }

        for i in 0..NO_OF_NOTCHES {
            let delta_x = out.cleaned_points_x[i + 1] - out.cleaned_points_x[0];
            let delta_y = out.cleaned_points_y[i + 1] - out.cleaned_points_y[0];
            let mag = sqrtf(delta_x * delta_x + delta_y * delta_y);

            // if the cleaned point was at the center and would be a firefox notch
            // average the previous and next points (cardinal & diagonal) for some sanity
            if mag < NOTCH_SKIP_THRESHOLD && NOTCH_STATUS_DEFAULTS[i] == NotchStatus::TertActive {
                let prev_index = ((i + NO_OF_NOTCHES - 1) % NO_OF_NOTCHES) + 1;
                let next_index = ((i + 1) % NO_OF_NOTCHES) + 1;

                out.cleaned_points_x[i + 1] =
                    (out.cleaned_points_x[prev_index] + out.cleaned_points_x[next_index]) / 2.0;
                out.cleaned_points_y[i + 1] =
                    (out.cleaned_points_y[prev_index] + out.cleaned_points_y[next_index]) / 2.0;

                out.notch_points_x[i + 1] =
                    (out.notch_points_x[prev_index] + out.notch_points_x[next_index]) / 2.0;
                out.notch_points_y[i + 1] =
                    (out.notch_points_y[prev_index] + out.notch_points_y[next_index]) / 2.0;

                debug!("Skipping notch {}", i + 1);

                // Mark that notch adjustment should be skipped for this
                out.notch_status[i] = NotchStatus::TertInactive;
            } else {
                out.notch_status[i] = NOTCH_STATUS_DEFAULTS[i];
            }
        }

        debug!("Final points:");
        for i in 0..=NO_OF_NOTCHES {
            debug!(
                "Cleaned: ({}, {}), Notch: ({}, {})",
                out.cleaned_points_x[i],
                out.cleaned_points_y[i],
                out.notch_points_x[i],
                out.notch_points_y[i],
            );
        }

        debug!("The notch statuses are: {}", out.notch_status);

        out
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LinearizedCalibration {
    pub fit_coeffs_x: [f64; NUM_COEFFS],
    pub fit_coeffs_y: [f64; NUM_COEFFS],

    pub out_x: [f32; NO_OF_NOTCHES],
    pub out_y: [f32; NO_OF_NOTCHES],

    /// The cleaned origin the fit was made for.
    pub origin: XyValuePair<f32>,
}

impl LinearizedCalibration {
    ///
    /// Generate a fit to linearize the stick response.
    ///
    /// Inputs:
    ///     cleaned points X and Y, the first being the center, the others starting at 3 oclock and going around counterclockwise
    ///     the layout that picks the fit points out of the cleaned points
    ///     the ideal output value of every fit point, per axis
    ///
    ///	Outputs:
    ///		linearization fit coefficients for X and Y, and the linearized notch points
    pub fn from_points<F: CurveFitter>(
        in_x: &[f32; NO_OF_NOTCHES + 1],
        in_y: &[f32; NO_OF_NOTCHES + 1],
        layout: &GateLayout,
        targets: &FitTargets,
        fitter: &F,
    ) -> Self {
        let fit_points = layout.select_fit_points(in_x, in_y);

        debug!("Fit points X: {}, Y: {}", fit_points.x, fit_points.y);

        let fit_coeffs_x =
            fitter.fit_curve::<NO_OF_FIT_POINTS, NUM_COEFFS>(&fit_points.x, &targets.x);
        let fit_coeffs_y =
            fitter.fit_curve::<NO_OF_FIT_POINTS, NUM_COEFFS>(&fit_points.y, &targets.y);

        if !fit_coeffs_x.iter().chain(fit_coeffs_y.iter()).all(|c| c.is_finite()) {
            warn!(
                "Degenerate linearization fit, X: {}, Y: {}",
                fit_coeffs_x, fit_coeffs_y
            );
        }

        let coeffs = XyValuePair {
            x: fit_coeffs_x,
            y: fit_coeffs_y,
        }
        .map(|c| c.map(|e| e as f32));

        let mut out_x = [0f32; NO_OF_NOTCHES];
        let mut out_y = [0f32; NO_OF_NOTCHES];

        for i in 0..NO_OF_NOTCHES {
            out_x[i] = linearize(in_x[i + 1], &coeffs.x);
            out_y[i] = linearize(in_y[i + 1], &coeffs.y);
        }

        Self {
            fit_coeffs_x,
            fit_coeffs_y,
            out_x,
            out_y,
            origin: XyValuePair {
                x: in_x[0],
                y: in_y[0],
            },
        }
    }

    /// Shift the fit so the origin linearizes to exactly 0 on both axes.
    pub fn zero_centered(mut self) -> Self {
        let x_zero_error = linearize(self.origin.x, &self.fit_coeffs_x.map(|e| e as f32));
        let y_zero_error = linearize(self.origin.y, &self.fit_coeffs_y.map(|e| e as f32));

        self.fit_coeffs_x[3] -= x_zero_error as f64;
        self.fit_coeffs_y[3] -= y_zero_error as f64;

        for i in 0..NO_OF_NOTCHES {
            self.out_x[i] -= x_zero_error;
            self.out_y[i] -= y_zero_error;
        }

        self
    }
}

/// Linearize the cleaned points with the default gate layout and fitter.
///
/// The fitted coefficients are written to `stick_params`, the linearized
/// notch points are returned.
pub fn linearize_cal(
    cleaned_points_x: &[f32; NO_OF_NOTCHES + 1],
    cleaned_points_y: &[f32; NO_OF_NOTCHES + 1],
    targets: &FitTargets,
    stick_params: &mut StickParams,
) -> ([f32; NO_OF_NOTCHES], [f32; NO_OF_NOTCHES]) {
    let linearized = LinearizedCalibration::from_points(
        cleaned_points_x,
        cleaned_points_y,
        &DEFAULT_GATE_LAYOUT,
        targets,
        &LeastSquaresFit,
    );

    stick_params.apply_linearization(&linearized);

    (linearized.out_x, linearized.out_y)
}

/// Compute the stick x/y coordinates from a given angle.
/// The stick moves spherically, so it requires 3D trigonometry.
pub fn calc_stick_values(angle: f32) -> (f32, f32) {
    let x =
        100. * atan2f(sinf(MAX_STICK_ANGLE) * cosf(angle), cosf(MAX_STICK_ANGLE)) / MAX_STICK_ANGLE;
    let y =
        100. * atan2f(sinf(MAX_STICK_ANGLE) * sinf(angle), cosf(MAX_STICK_ANGLE)) / MAX_STICK_ANGLE;

    (x, y)
}

/// Convert x/y coordinates (really angles on a sphere) to an azimuth in `[0, 2π)`.
///
/// Goes through a 3D point on the sphere and drops it back to 2D. This is
/// meant to undo [`calc_stick_values`], but is only treated as approximate.
pub fn angle_on_sphere(x: f32, y: f32) -> f32 {
    let x = x * MAX_STICK_ANGLE / 100.;
    let y = y * MAX_STICK_ANGLE / 100.;

    let xx = sinf(x) * cosf(y);
    let yy = cosf(x) * sinf(y);

    match atan2f(yy, xx) {
        a if a < 0. => a + TWO_PI,
        a => a,
    }
}

pub fn linearize(point: f32, coefficients: &[f32; NUM_COEFFS]) -> f32 {
    coefficients[0] * (point * point * point)
        + coefficients[1] * (point * point)
        + coefficients[2] * point
        + coefficients[3]
}
