//! Dormand-Prince 7(6) embedded Runge-Kutta-Nyström pair
//!
//! Nine stages. The seventh-order solution is propagated and its
//! sixth-order companion supplies the local error estimate, so the step
//! adapts with exponent 1/7.

use super::nystrom::{NystromTableau, nystrom_step};
use super::tableau::Workspace;
use super::Integrator;
use crate::physics::acceleration::AccelerationField;
use crate::physics::body_data::BodyData;
use crate::physics::math::Scalar;

pub const RKN76_TABLEAU: NystromTableau = NystromTableau {
    c: &[
        0.0,
        0.0385,
        0.09166666666666666,
        0.11,
        0.1440330395341164,
        0.3,
        0.5,
        0.8207677108844623,
        1.0,
    ],
    a: &[
        &[],
        &[
            0.000741125,
        ],
        &[
            0.0008669532627865961,
            0.0033344356261022926,
        ],
        &[
            0.0013252380952380953,
            0.003973727422003284,
            0.0007510344827586207,
        ],
        &[
            0.0016813212068733639,
            0.006069322492467048,
            0.0013142663345359672,
            0.0013078482048417897,
        ],
        &[
            0.03966301281852329,
            -0.14080286782094661,
            0.7071010165297219,
            -0.7610327710699135,
            0.20007160954261494,
        ],
        &[
            0.13422991088403097,
            -0.21881696297759176,
            -1.0339426169254384,
            1.9914784714570235,
            -0.8293927644090134,
            0.08144396197098916,
        ],
        &[
            -0.07937794698193684,
            0.8556202621488829,
            0.5923910537951436,
            -4.721842418944526,
            4.012364950920472,
            -0.5378085378700161,
            0.21548245454724121,
        ],
        &[
            1.3310493205048985,
            -2.9833930411856397,
            2.0584745527974206,
            0.1022027574524936,
            -0.08237268394939591,
            -0.21236233529840948,
            0.2428687794783963,
            0.04353265020023624,
        ],
    ],
    a_velocity: &[
        &[],
        &[
            0.0385,
        ],
        &[
            -0.01746031746031746,
            0.10912698412698413,
        ],
        &[
            0.012571428571428572,
            0.054187192118226604,
            0.04324137931034483,
        ],
        &[
            0.006187646370907211,
            0.07736977036743645,
            -0.040456558474738016,
            0.10093218127051076,
        ],
        &[
            -0.6770094478362925,
            1.8555259597912155,
            -0.9928500795856725,
            -1.4134998588219447,
            1.5278334264526943,
        ],
        &[
            -0.9809023636715444,
            1.4223140623986452,
            0.9269570071559934,
            0.12185776335678856,
            -1.7242974768999084,
            0.7340710076600256,
        ],
        &[
            -0.8534314123581785,
            0.18168361749550577,
            0.7261881846195626,
            0.722706345081579,
            0.5172471178230901,
            -1.7304122322207185,
            1.2567860904436219,
        ],
        &[
            -0.048366873639163206,
            0.01399614888138491,
            0.07950593091785738,
            0.09711923033190921,
            0.12378988173918416,
            0.1701093201669529,
            0.15637336775780852,
            0.4074729938440661,
        ],
    ],
    b: &[
        0.042225430164289104,
        0.0,
        0.0,
        0.0,
        0.2172649824731309,
        0.0859856959891681,
        0.3233583326828425,
        0.278598068936586,
        0.05256748975398343,
    ],
    b_hat: &[
        0.031972130204238294,
        0.0,
        0.0,
        0.11397265555622793,
        0.09039776817655287,
        0.1168424648165603,
        0.31437587770294967,
        0.2802901169012253,
        0.05214898664224563,
    ],
};

#[derive(Debug, Clone, Copy, Default)]
pub struct DormandPrince76;

impl Integrator for DormandPrince76 {
    fn clone_box(&self) -> Box<dyn Integrator> {
        Box::new(*self)
    }

    fn step(
        &self,
        bodies: &BodyData,
        field: &dyn AccelerationField,
        dt: Scalar,
        workspace: &mut Workspace,
    ) -> Option<Scalar> {
        Some(nystrom_step(&RKN76_TABLEAU, bodies, field, dt, workspace))
    }

    fn order(&self) -> usize {
        7
    }

    fn error_order(&self) -> Option<usize> {
        Some(6)
    }

    fn stages(&self) -> usize {
        RKN76_TABLEAU.stages()
    }

    fn name(&self) -> &str {
        "dormand_prince_76"
    }
}
