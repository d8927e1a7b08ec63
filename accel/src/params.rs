use crate::backend::{BuildQuality, GeometryKind, SceneFlags};

/// Which primitive kinds a build admits.
#[derive(Debug, Copy, Clone)]
pub struct PrimitiveMask {
    pub triangles: bool,
    pub curves: bool,
}

impl Default for PrimitiveMask {
    fn default() -> PrimitiveMask {
        PrimitiveMask {
            triangles: true,
            curves: true,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CurveBasis {
    Linear,
    Hermite,
}

/// Build configuration for one adapter instance.
#[derive(Debug, Clone)]
pub struct BVHParams {
    /// Top-level scene (objects + instances) vs per-mesh bottom level.
    pub top_level: bool,
    pub use_spatial_split: bool,
    /// Interactive/deforming content; trades quality for rebuild speed.
    pub use_dynamic: bool,
    pub use_motion_blur: bool,
    pub primitive_mask: PrimitiveMask,
    pub curve_basis: CurveBasis,
    /// Render curves as camera-facing ribbons instead of swept tubes.
    pub curve_ribbons: bool,
    pub curve_subdivisions: usize,
}

impl Default for BVHParams {
    fn default() -> BVHParams {
        BVHParams {
            top_level: true,
            use_spatial_split: false,
            use_dynamic: false,
            use_motion_blur: true,
            primitive_mask: PrimitiveMask::default(),
            curve_basis: CurveBasis::Hermite,
            curve_ribbons: true,
            curve_subdivisions: 4,
        }
    }
}

impl BVHParams {
    pub fn scene_build_quality(&self) -> BuildQuality {
        if self.use_dynamic {
            BuildQuality::Low
        } else if self.use_spatial_split {
            BuildQuality::High
        } else {
            BuildQuality::Medium
        }
    }

    pub fn geometry_build_quality(&self) -> BuildQuality {
        if self.use_dynamic {
            BuildQuality::Refit
        } else {
            BuildQuality::Medium
        }
    }

    pub fn scene_flags(&self) -> SceneFlags {
        SceneFlags {
            dynamic: self.use_dynamic,
            compact: true,
            robust: true,
        }
    }

    pub fn curve_geometry_kind(&self) -> GeometryKind {
        match (self.curve_basis, self.curve_ribbons) {
            (CurveBasis::Linear, _) => GeometryKind::FlatLinearCurve,
            (CurveBasis::Hermite, true) => GeometryKind::FlatHermiteCurve,
            (CurveBasis::Hermite, false) => GeometryKind::RoundHermiteCurve,
        }
    }

    /// Hermite curves carry a tangent buffer; linear ones do not.
    pub fn curves_need_tangents(&self) -> bool {
        self.curve_basis == CurveBasis::Hermite
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_quality_selection() {
        let mut params = BVHParams::default();
        assert_eq!(params.scene_build_quality(), BuildQuality::Medium);

        params.use_spatial_split = true;
        assert_eq!(params.scene_build_quality(), BuildQuality::High);

        // dynamic wins over spatial splits
        params.use_dynamic = true;
        assert_eq!(params.scene_build_quality(), BuildQuality::Low);
        assert_eq!(params.geometry_build_quality(), BuildQuality::Refit);
    }

    #[test]
    fn curve_kind_selection() {
        let mut params = BVHParams::default();
        assert_eq!(
            params.curve_geometry_kind(),
            GeometryKind::FlatHermiteCurve
        );
        assert!(params.curves_need_tangents());

        params.curve_ribbons = false;
        assert_eq!(
            params.curve_geometry_kind(),
            GeometryKind::RoundHermiteCurve
        );

        params.curve_basis = CurveBasis::Linear;
        assert_eq!(params.curve_geometry_kind(), GeometryKind::FlatLinearCurve);
        assert!(!params.curves_need_tangents());
    }
}
