//! Frame definition: nodes, material grades, members and loads.

use std::collections::HashMap;

use nalgebra::Vector3;
use petgraph::graph::{EdgeIndex, NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};

use crate::errors::{FrameError, MaterialError};
use crate::geometry::{Dof, Point, DOFS_PER_NODE};

/// Identifier of a node, unique within a frame.
pub type NodeId = usize;

/// Identifier of a member, unique within a frame.
pub type MemberId = usize;

/// Handle to a material grade stored in a [`Frame`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MaterialId(usize);

impl MaterialId {
    /// Position of the grade in the frame's material table.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

/// Material and cross-section properties shared by every member of one grade.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Material {
    /// Human readable grade name.
    pub name: String,
    /// Young's modulus in pascals.
    pub elastic_modulus: f64,
    /// Cross-sectional area in square metres.
    pub area: f64,
    /// Second moment of area about the strong axis in m^4.
    pub moment_of_inertia: f64,
    /// Yield stress in pascals.
    pub yield_stress: f64,
}

impl Material {
    /// Create a material grade.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        elastic_modulus: f64,
        area: f64,
        moment_of_inertia: f64,
        yield_stress: f64,
    ) -> Self {
        Self {
            name: name.into(),
            elastic_modulus,
            area,
            moment_of_inertia,
            yield_stress,
        }
    }

    /// S275 structural steel with a compact 0.01 m^2 section.
    #[must_use]
    pub fn s275() -> Self {
        Self::new("S275 Steel", 200.0e9, 0.01, 1.0e-4, 275.0e6)
    }

    /// S355 structural steel with a compact 0.01 m^2 section.
    #[must_use]
    pub fn s355() -> Self {
        Self::new("S355 Steel", 200.0e9, 0.01, 1.0e-4, 355.0e6)
    }

    /// Return a copy of this grade under a new name with a different section.
    #[must_use]
    pub fn with_section(&self, name: impl Into<String>, area: f64, moment_of_inertia: f64) -> Self {
        Self {
            name: name.into(),
            area,
            moment_of_inertia,
            ..self.clone()
        }
    }

    /// Return a copy of this grade with a different yield stress.
    #[must_use]
    pub fn with_yield_stress(&self, yield_stress: f64) -> Self {
        Self {
            yield_stress,
            ..self.clone()
        }
    }

    /// Approximate distance from the neutral axis to the extreme fibre, `sqrt(I/A)`.
    #[must_use]
    pub fn extreme_fibre(&self) -> f64 {
        (self.moment_of_inertia / self.area).sqrt()
    }

    /// Check that every property is strictly positive.
    ///
    /// # Errors
    ///
    /// Returns the first [`MaterialError`] encountered.
    pub fn validate(&self) -> Result<(), MaterialError> {
        // `!(x > 0.0)` also rejects NaN.
        if !(self.elastic_modulus > 0.0) {
            return Err(MaterialError::NonPositiveElasticModulus {
                name: self.name.clone(),
                value: self.elastic_modulus,
            });
        }
        if !(self.area > 0.0) {
            return Err(MaterialError::NonPositiveArea {
                name: self.name.clone(),
                value: self.area,
            });
        }
        if !(self.moment_of_inertia > 0.0) {
            return Err(MaterialError::NonPositiveMomentOfInertia {
                name: self.name.clone(),
                value: self.moment_of_inertia,
            });
        }
        if !(self.yield_stress > 0.0) {
            return Err(MaterialError::NonPositiveYieldStress {
                name: self.name.clone(),
                value: self.yield_stress,
            });
        }
        Ok(())
    }
}

/// A joint of the frame.
#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    /// Identifier of the node.
    id: NodeId,
    /// Position of the node in metres.
    position: Point,
    /// Restraint flag per degree of freedom.
    restraints: [bool; DOFS_PER_NODE],
}

impl Node {
    /// Identifier of the node.
    #[must_use]
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Position of the node in metres.
    #[must_use]
    pub fn position(&self) -> Point {
        self.position
    }

    /// Whether `dof` is restrained.
    #[must_use]
    pub fn is_restrained(&self, dof: Dof) -> bool {
        self.restraints[dof.index()]
    }

    /// Iterate over the restrained degrees of freedom in global order.
    pub fn restrained_dofs(&self) -> impl Iterator<Item = Dof> + '_ {
        Dof::ALL.into_iter().filter(|dof| self.is_restrained(*dof))
    }
}

/// A beam-column member connecting two nodes.
#[derive(Clone, Debug, PartialEq)]
pub struct Member {
    /// Identifier of the member.
    id: MemberId,
    /// Start node.
    start: NodeId,
    /// End node.
    end: NodeId,
    /// Material grade.
    material: MaterialId,
    /// Set once the member has failed; never reset.
    failed: bool,
}

impl Member {
    /// Identifier of the member.
    #[must_use]
    pub fn id(&self) -> MemberId {
        self.id
    }

    /// Start node id.
    #[must_use]
    pub fn start(&self) -> NodeId {
        self.start
    }

    /// End node id.
    #[must_use]
    pub fn end(&self) -> NodeId {
        self.end
    }

    /// Material grade of the member.
    #[must_use]
    pub fn material(&self) -> MaterialId {
        self.material
    }

    /// Whether the member has failed.
    #[must_use]
    pub fn is_failed(&self) -> bool {
        self.failed
    }
}

/// A nodal force or moment.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Load {
    /// Loaded node.
    pub node: NodeId,
    /// Degree of freedom the load acts on.
    pub dof: Dof,
    /// Signed magnitude in newtons or newton-metres.
    pub magnitude: f64,
}

/// Geometry of a member derived from its endpoints.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MemberGeometry {
    /// Length in metres.
    pub length: f64,
    /// Unit vector from start to end.
    pub axis: Vector3<f64>,
    /// First global equation of the start node.
    pub start_dof: usize,
    /// First global equation of the end node.
    pub end_dof: usize,
}

impl MemberGeometry {
    /// The twelve global equations of the member, start node first.
    #[must_use]
    pub fn dof_map(&self) -> [usize; 2 * DOFS_PER_NODE] {
        let mut map = [0; 2 * DOFS_PER_NODE];
        for offset in 0..DOFS_PER_NODE {
            map[offset] = self.start_dof + offset;
            map[DOFS_PER_NODE + offset] = self.end_dof + offset;
        }
        map
    }
}

/// Container for a frame model.
///
/// Nodes and members live in a graph so the connectivity needed for energy
/// redistribution is available directly. After the frame has been built the
/// only state that changes is each member's failure flag.
#[derive(Clone, Debug)]
pub struct Frame {
    /// Name used in reports.
    name: String,
    /// Joints as nodes, members as edges.
    graph: UnGraph<Node, Member>,
    /// Lookup from node id to graph index.
    nodes: HashMap<NodeId, NodeIndex>,
    /// Lookup from member id to graph index.
    members: HashMap<MemberId, EdgeIndex>,
    /// Material table indexed by [`MaterialId`].
    materials: Vec<Material>,
    /// Applied nodal loads.
    loads: Vec<Load>,
}

impl Frame {
    /// Create an empty frame.
    ///
    /// # Examples
    /// ```
    /// use collapsex::Frame;
    ///
    /// let frame = Frame::new("empty");
    /// assert_eq!(frame.node_count(), 0);
    /// assert_eq!(frame.dof_count(), 0);
    /// ```
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            graph: UnGraph::new_undirected(),
            nodes: HashMap::new(),
            members: HashMap::new(),
            materials: Vec::new(),
            loads: Vec::new(),
        }
    }

    /// Name of the frame.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Number of members, failed or not.
    #[must_use]
    pub fn member_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Size of the global system, six equations per node.
    #[must_use]
    pub fn dof_count(&self) -> usize {
        self.node_count() * DOFS_PER_NODE
    }

    /// Register a material grade and return its handle.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::InvalidMaterial`] when any property is not strictly positive.
    pub fn add_material(&mut self, material: Material) -> Result<MaterialId, FrameError> {
        material.validate()?;
        self.materials.push(material);
        Ok(MaterialId(self.materials.len() - 1))
    }

    /// Look up a material grade.
    #[must_use]
    pub fn material(&self, id: MaterialId) -> Option<&Material> {
        self.materials.get(id.0)
    }

    /// Replace a grade; every member referencing it sees the change.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::UnknownMaterial`] for a foreign handle and
    /// [`FrameError::InvalidMaterial`] when the new properties are rejected.
    pub fn update_material(&mut self, id: MaterialId, material: Material) -> Result<(), FrameError> {
        if id.0 >= self.materials.len() {
            return Err(FrameError::UnknownMaterial(id));
        }
        material.validate()?;
        self.materials[id.0] = material;
        Ok(())
    }

    /// Add a node at `position` with no restraints.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::DuplicateNode`] when `id` is already taken.
    pub fn add_node(&mut self, id: NodeId, position: Point) -> Result<(), FrameError> {
        if self.nodes.contains_key(&id) {
            return Err(FrameError::DuplicateNode(id));
        }
        let index = self.graph.add_node(Node {
            id,
            position,
            restraints: [false; DOFS_PER_NODE],
        });
        self.nodes.insert(id, index);
        Ok(())
    }

    /// Restrain the listed degrees of freedom of a node.
    ///
    /// Restraints accumulate; a freedom once restrained stays restrained.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::UnknownNode`] when `id` is not part of this frame.
    pub fn set_support(&mut self, id: NodeId, dofs: &[Dof]) -> Result<(), FrameError> {
        let index = self.node_index(id)?;
        let node = &mut self.graph[index];
        for dof in dofs {
            node.restraints[dof.index()] = true;
        }
        Ok(())
    }

    /// Connect two nodes with a new member of the given grade.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::DuplicateMember`], [`FrameError::UnknownNode`],
    /// [`FrameError::UnknownMaterial`] or [`FrameError::ZeroLengthMember`].
    pub fn add_member(
        &mut self,
        id: MemberId,
        start: NodeId,
        end: NodeId,
        material: MaterialId,
    ) -> Result<(), FrameError> {
        if self.members.contains_key(&id) {
            return Err(FrameError::DuplicateMember(id));
        }
        let start_index = self.node_index(start)?;
        let end_index = self.node_index(end)?;
        if self.material(material).is_none() {
            return Err(FrameError::UnknownMaterial(material));
        }
        let length = self.graph[start_index]
            .position
            .distance_to(self.graph[end_index].position);
        if length == 0.0 {
            return Err(FrameError::ZeroLengthMember(id));
        }
        let edge = self.graph.add_edge(
            start_index,
            end_index,
            Member {
                id,
                start,
                end,
                material,
                failed: false,
            },
        );
        self.members.insert(id, edge);
        Ok(())
    }

    /// Point a single member at another grade.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::UnknownMember`] or [`FrameError::UnknownMaterial`].
    pub fn assign_material(&mut self, member: MemberId, material: MaterialId) -> Result<(), FrameError> {
        if self.material(material).is_none() {
            return Err(FrameError::UnknownMaterial(material));
        }
        let edge = self.member_index(member)?;
        self.graph[edge].material = material;
        Ok(())
    }

    /// Apply a nodal load. Loads on the same freedom add up.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::UnknownNode`] when `node` is not part of this frame.
    pub fn add_load(&mut self, node: NodeId, dof: Dof, magnitude: f64) -> Result<(), FrameError> {
        self.node_index(node)?;
        self.loads.push(Load {
            node,
            dof,
            magnitude,
        });
        Ok(())
    }

    /// Look up a node by id.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::UnknownNode`] when `id` is not part of this frame.
    pub fn node(&self, id: NodeId) -> Result<&Node, FrameError> {
        Ok(&self.graph[self.node_index(id)?])
    }

    /// Look up a member by id.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::UnknownMember`] when `id` is not part of this frame.
    pub fn member(&self, id: MemberId) -> Result<&Member, FrameError> {
        Ok(&self.graph[self.member_index(id)?])
    }

    /// Material grade of a member.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::UnknownMember`] or [`FrameError::UnknownMaterial`].
    pub fn member_material(&self, id: MemberId) -> Result<&Material, FrameError> {
        let handle = self.member(id)?.material;
        self.material(handle)
            .ok_or(FrameError::UnknownMaterial(handle))
    }

    /// Iterate over nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> + '_ {
        self.graph.node_weights()
    }

    /// Iterate over members in insertion order.
    pub fn members(&self) -> impl Iterator<Item = &Member> + '_ {
        self.graph.edge_weights()
    }

    /// Iterate over members that have not failed.
    pub fn active_members(&self) -> impl Iterator<Item = &Member> + '_ {
        self.members().filter(|member| !member.failed)
    }

    /// Applied loads in insertion order.
    #[must_use]
    pub fn loads(&self) -> &[Load] {
        &self.loads
    }

    /// Number of members that have not failed.
    #[must_use]
    pub fn active_member_count(&self) -> usize {
        self.active_members().count()
    }

    /// Whether every member has failed. An empty frame counts as failed.
    #[must_use]
    pub fn all_failed(&self) -> bool {
        self.members().all(Member::is_failed)
    }

    /// First global equation of a node.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::UnknownNode`] when `id` is not part of this frame.
    pub fn dof_base(&self, id: NodeId) -> Result<usize, FrameError> {
        Ok(self.node_index(id)?.index() * DOFS_PER_NODE)
    }

    /// Length, direction and equation numbers of a member.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::UnknownMember`] when `id` is not part of this frame.
    pub fn member_geometry(&self, id: MemberId) -> Result<MemberGeometry, FrameError> {
        let edge = self.member_index(id)?;
        let (start, end) = self
            .graph
            .edge_endpoints(edge)
            .ok_or(FrameError::UnknownMember(id))?;
        let delta = self.graph[end].position.to_vector() - self.graph[start].position.to_vector();
        let length = delta.norm();
        if length == 0.0 {
            return Err(FrameError::ZeroLengthMember(id));
        }
        Ok(MemberGeometry {
            length,
            axis: delta / length,
            start_dof: start.index() * DOFS_PER_NODE,
            end_dof: end.index() * DOFS_PER_NODE,
        })
    }

    /// Axial stiffness `EA/L` of a member.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::UnknownMember`] when `id` is not part of this frame.
    pub fn axial_stiffness(&self, id: MemberId) -> Result<f64, FrameError> {
        let material = self.member_material(id)?;
        let geometry = self.member_geometry(id)?;
        Ok(material.elastic_modulus * material.area / geometry.length)
    }

    /// Members, failed or not, that share at least one node with `id`.
    ///
    /// Each neighbour is reported once, in ascending id order.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::UnknownMember`] when `id` is not part of this frame.
    pub fn adjacent_members(&self, id: MemberId) -> Result<Vec<MemberId>, FrameError> {
        let edge = self.member_index(id)?;
        let (start, end) = self
            .graph
            .edge_endpoints(edge)
            .ok_or(FrameError::UnknownMember(id))?;
        let mut neighbours: Vec<MemberId> = [start, end]
            .into_iter()
            .flat_map(|node| self.graph.edges(node))
            .filter(|other| other.id() != edge)
            .map(|other| other.weight().id)
            .collect();
        neighbours.sort_unstable();
        neighbours.dedup();
        Ok(neighbours)
    }

    /// Mark a member as failed. Returns `true` when the flag changed.
    pub(crate) fn mark_failed(&mut self, id: MemberId) -> Result<bool, FrameError> {
        let edge = self.member_index(id)?;
        let member = &mut self.graph[edge];
        let changed = !member.failed;
        member.failed = true;
        Ok(changed)
    }

    /// Resolve a node id to its graph index.
    fn node_index(&self, id: NodeId) -> Result<NodeIndex, FrameError> {
        self.nodes
            .get(&id)
            .copied()
            .ok_or(FrameError::UnknownNode(id))
    }

    /// Resolve a member id to its graph index.
    fn member_index(&self, id: MemberId) -> Result<EdgeIndex, FrameError> {
        self.members
            .get(&id)
            .copied()
            .ok_or(FrameError::UnknownMember(id))
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::geometry::point;

    fn two_span_frame() -> Frame {
        let mut frame = Frame::new("two span");
        let steel = frame.add_material(Material::s275()).expect("valid grade");
        frame.add_node(10, point(0.0, 0.0, 0.0)).expect("node");
        frame.add_node(20, point(5.0, 0.0, 0.0)).expect("node");
        frame.add_node(30, point(10.0, 0.0, 0.0)).expect("node");
        frame.add_member(1, 10, 20, steel).expect("member");
        frame.add_member(2, 20, 30, steel).expect("member");
        frame
    }

    #[test]
    fn duplicate_and_unknown_ids_are_rejected() {
        let mut frame = two_span_frame();
        let steel = MaterialId(0);

        assert_eq!(
            frame.add_node(10, point(1.0, 1.0, 0.0)),
            Err(FrameError::DuplicateNode(10))
        );
        assert_eq!(
            frame.add_member(1, 10, 30, steel),
            Err(FrameError::DuplicateMember(1))
        );
        assert_eq!(
            frame.add_member(3, 10, 99, steel),
            Err(FrameError::UnknownNode(99))
        );
        assert_eq!(
            frame.add_member(3, 10, 30, MaterialId(7)),
            Err(FrameError::UnknownMaterial(MaterialId(7)))
        );
        assert_eq!(
            frame.set_support(99, &[Dof::Ux]),
            Err(FrameError::UnknownNode(99))
        );
        assert_eq!(
            frame.add_load(99, Dof::Uy, -1.0),
            Err(FrameError::UnknownNode(99))
        );
        assert_eq!(frame.member(42).err(), Some(FrameError::UnknownMember(42)));
    }

    #[test]
    fn zero_length_member_is_rejected() {
        let mut frame = Frame::new("degenerate");
        let steel = frame.add_material(Material::s275()).expect("valid grade");
        frame.add_node(0, point(1.0, 1.0, 1.0)).expect("node");
        frame.add_node(1, point(1.0, 1.0, 1.0)).expect("node");
        assert_eq!(
            frame.add_member(0, 0, 1, steel),
            Err(FrameError::ZeroLengthMember(0))
        );
    }

    #[test]
    fn invalid_material_properties_are_rejected() {
        let mut frame = Frame::new("materials");
        let error = frame
            .add_material(Material::s275().with_yield_stress(0.0))
            .expect_err("zero capacity rejected");
        assert!(matches!(
            error,
            FrameError::InvalidMaterial(MaterialError::NonPositiveYieldStress { .. })
        ));

        let error = frame
            .add_material(Material::new("nan", f64::NAN, 0.01, 1.0e-4, 1.0))
            .expect_err("NaN modulus rejected");
        assert!(matches!(
            error,
            FrameError::InvalidMaterial(MaterialError::NonPositiveElasticModulus { .. })
        ));

        let error = frame
            .add_material(Material::s275().with_section("flat", 0.01, -1.0))
            .expect_err("negative inertia rejected");
        assert!(matches!(
            error,
            FrameError::InvalidMaterial(MaterialError::NonPositiveMomentOfInertia { .. })
        ));
    }

    #[test]
    fn updating_a_grade_affects_every_member() {
        let mut frame = two_span_frame();
        let grade = frame.member(1).expect("member").material();
        frame
            .update_material(grade, Material::s275().with_yield_stress(1.0))
            .expect("update accepted");
        for id in [1, 2] {
            let material = frame.member_material(id).expect("material");
            assert_relative_eq!(material.yield_stress, 1.0);
        }
    }

    #[test]
    fn assigning_a_grade_affects_one_member() {
        let mut frame = two_span_frame();
        let weak = frame
            .add_material(Material::s275().with_yield_stress(1.0))
            .expect("grade");
        frame.assign_material(1, weak).expect("assignment");
        assert_relative_eq!(frame.member_material(1).expect("m1").yield_stress, 1.0);
        assert_relative_eq!(frame.member_material(2).expect("m2").yield_stress, 275.0e6);
    }

    #[test]
    fn geometry_uses_insertion_order_for_equations() {
        let frame = two_span_frame();
        assert_eq!(frame.dof_count(), 18);
        assert_eq!(frame.dof_base(20), Ok(6));

        let geometry = frame.member_geometry(2).expect("geometry");
        assert_relative_eq!(geometry.length, 5.0);
        assert_relative_eq!(geometry.axis, Vector3::new(1.0, 0.0, 0.0));
        assert_eq!(geometry.dof_map()[0], 6);
        assert_eq!(geometry.dof_map()[11], 17);

        let stiffness = frame.axial_stiffness(2).expect("stiffness");
        assert_relative_eq!(stiffness, 200.0e9 * 0.01 / 5.0);
    }

    #[test]
    fn adjacency_follows_shared_nodes() {
        let frame = two_span_frame();
        assert_eq!(frame.adjacent_members(1), Ok(vec![2]));
        assert_eq!(frame.adjacent_members(2), Ok(vec![1]));
    }

    #[test]
    fn failure_flag_is_monotonic() {
        let mut frame = two_span_frame();
        assert!(!frame.all_failed());
        assert_eq!(frame.mark_failed(1), Ok(true));
        assert_eq!(frame.mark_failed(1), Ok(false));
        assert_eq!(frame.active_member_count(), 1);
        frame.mark_failed(2).expect("known member");
        assert!(frame.all_failed());
        assert!(frame.member(1).expect("member").is_failed());
    }

    #[test]
    fn supports_accumulate() {
        let mut frame = two_span_frame();
        frame.set_support(10, &[Dof::Ux]).expect("support");
        frame.set_support(10, &[Dof::Uy]).expect("support");
        let restrained: Vec<Dof> = frame.node(10).expect("node").restrained_dofs().collect();
        assert_eq!(restrained, vec![Dof::Ux, Dof::Uy]);
    }
}
