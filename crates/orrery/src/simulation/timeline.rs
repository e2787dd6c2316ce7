use crate::physics::math::Scalar;

/// Integration interval and output cadence, all in days.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeLine {
    pub start: Scalar,
    /// Signed; a negative length integrates backwards
    pub length: Scalar,
    /// Positive distance between output boundaries
    pub output: Scalar,
}

impl TimeLine {
    pub fn new(start: Scalar, length: Scalar, output: Scalar) -> Result<Self, String> {
        if !start.is_finite() {
            return Err(format!("timeline start must be finite, got {start}"));
        }
        if !length.is_finite() || length == 0.0 {
            return Err(format!("timeline length must be finite and non-zero, got {length}"));
        }
        if !output.is_finite() || output <= 0.0 {
            return Err(format!("output interval must be positive, got {output}"));
        }
        Ok(Self {
            start,
            length,
            output,
        })
    }

    pub fn end(&self) -> Scalar {
        self.start + self.length
    }

    pub fn direction(&self) -> Scalar {
        self.length.signum()
    }

    /// Boundary after `previous`, clipped to the end of the timeline.
    pub fn next_boundary(&self, previous: Scalar) -> Scalar {
        let next = previous + self.direction() * self.output;
        if (next - self.end()) * self.direction() >= 0.0 {
            self.end()
        } else {
            next
        }
    }

    /// Latest boundary at or before `time` in the run direction, following
    /// the same accumulation as the run so it matches published times
    /// exactly.
    pub fn boundary_reached_by(&self, time: Scalar) -> Scalar {
        let direction = self.direction();
        let mut boundary = self.start;
        while boundary != self.end() {
            let next = self.next_boundary(boundary);
            if (next - time) * direction > 0.0 {
                break;
            }
            boundary = next;
        }
        boundary
    }

    /// Number of output boundaries after the start.
    pub fn boundary_count(&self) -> usize {
        let mut count = 0;
        let mut boundary = self.start;
        while boundary != self.end() {
            boundary = self.next_boundary(boundary);
            count += 1;
        }
        count
    }
}
