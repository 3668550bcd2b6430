//! Global stiffness assembly for spatial beam-column elements.
//!
//! Each active member contributes a 12x12 block built from its axial and
//! strong-axis bending stiffness. The block is rotated from member axes to
//! global axes and scattered into a `(6N)x(6N)` matrix, following the direct
//! stiffness method (<https://en.wikipedia.org/wiki/Direct_stiffness_method>).

use nalgebra::{DMatrix, DVector, Matrix3, SMatrix, Vector3};

use crate::errors::FrameError;
use crate::frame::{Frame, Material};

/// Element stiffness or transformation block.
pub type ElementMatrix = SMatrix<f64, 12, 12>;

/// Element displacement or force vector.
pub type ElementVector = SMatrix<f64, 12, 1>;

/// A reference vector is rejected when its projection on the member axis exceeds this.
const COLLINEAR_LIMIT: f64 = 0.99;

/// Local stiffness of a member of the given length.
///
/// Local freedoms are ordered `ux, uy, uz, rx, ry, rz` at the start node
/// followed by the same six at the end node. Only the axial terms (`EA/L`) and
/// the bending terms in the local x-y plane (`EI/L^3`, `EI/L^2`, `EI/L`) are
/// populated.
#[must_use]
pub fn local_stiffness(material: &Material, length: f64) -> ElementMatrix {
    let ea = material.elastic_modulus * material.area;
    let ei = material.elastic_modulus * material.moment_of_inertia;
    let axial = ea / length;
    let shear = 12.0 * ei / length.powi(3);
    let coupling = 6.0 * ei / length.powi(2);
    let near = 4.0 * ei / length;
    let far = 2.0 * ei / length;

    let mut k = ElementMatrix::zeros();
    let mut set = |row: usize, col: usize, value: f64| {
        k[(row, col)] = value;
        k[(col, row)] = value;
    };

    set(0, 0, axial);
    set(6, 6, axial);
    set(0, 6, -axial);

    set(1, 1, shear);
    set(7, 7, shear);
    set(1, 7, -shear);
    set(1, 5, coupling);
    set(1, 11, coupling);
    set(5, 7, -coupling);
    set(7, 11, -coupling);
    set(5, 5, near);
    set(11, 11, near);
    set(5, 11, far);

    k
}

/// Rotation from global to member axes; rows are the local x, y and z unit vectors.
///
/// The local y axis lies in the plane spanned by the member axis and a
/// reference direction. Global Y is preferred, then global Z, then global X,
/// skipping any reference nearly parallel to the axis.
#[must_use]
pub fn rotation_matrix(axis: &Vector3<f64>) -> Matrix3<f64> {
    let reference = [Vector3::y(), Vector3::z(), Vector3::x()]
        .into_iter()
        .find(|candidate| axis.dot(candidate).abs() <= COLLINEAR_LIMIT)
        .unwrap_or_else(Vector3::x);
    let local_z = axis.cross(&reference).normalize();
    let local_y = local_z.cross(axis);
    Matrix3::from_rows(&[axis.transpose(), local_y.transpose(), local_z.transpose()])
}

/// Block-diagonal transformation with the rotation repeated for each 3-vector.
#[must_use]
pub fn transformation_matrix(axis: &Vector3<f64>) -> ElementMatrix {
    let rotation = rotation_matrix(axis);
    let mut t = ElementMatrix::zeros();
    for block in 0..4 {
        t.fixed_view_mut::<3, 3>(3 * block, 3 * block)
            .copy_from(&rotation);
    }
    t
}

/// Assemble the unconstrained global stiffness matrix.
///
/// Failed members contribute nothing. The result is symmetric up to rounding.
///
/// # Errors
///
/// Returns [`FrameError`] when a member refers to unknown nodes or materials.
pub fn assemble_global_stiffness(frame: &Frame) -> Result<DMatrix<f64>, FrameError> {
    let dof = frame.dof_count();
    let mut matrix = DMatrix::zeros(dof, dof);
    for member in frame.active_members() {
        let geometry = frame.member_geometry(member.id())?;
        let material = frame.member_material(member.id())?;
        let t = transformation_matrix(&geometry.axis);
        let global = t.transpose() * local_stiffness(material, geometry.length) * t;

        let dof_map = geometry.dof_map();
        for (row_local, global_row) in dof_map.iter().enumerate() {
            for (col_local, global_col) in dof_map.iter().enumerate() {
                matrix[(*global_row, *global_col)] += global[(row_local, col_local)];
            }
        }
    }
    Ok(matrix)
}

/// Enforce support restraints on an assembled system.
///
/// For every restrained freedom the row and column are cleared, the diagonal
/// is set to one and the load entry is zeroed, so the solve returns exactly
/// zero displacement there even when a load sits on the support.
///
/// # Errors
///
/// Returns [`FrameError`] when the frame's node table is inconsistent.
pub fn apply_constraints(
    frame: &Frame,
    stiffness: &mut DMatrix<f64>,
    load: &mut DVector<f64>,
) -> Result<(), FrameError> {
    for node in frame.nodes() {
        let base = frame.dof_base(node.id())?;
        for dof in node.restrained_dofs() {
            let index = base + dof.index();
            stiffness.row_mut(index).fill(0.0);
            stiffness.column_mut(index).fill(0.0);
            stiffness[(index, index)] = 1.0;
            load[index] = 0.0;
        }
    }
    Ok(())
}
