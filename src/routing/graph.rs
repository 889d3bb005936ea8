/*!

Component G: the routing graph. One vertex per architecture resource that
can carry a unit of routable traffic — a port, a link, or an internal
pass-through inside a mappable primitive — wired into a directed graph
that follows signal flow. [`crate::routing::pathfinder`] never touches the
architecture tree directly; everything it needs is read off this graph.

*/

use std::collections::{BTreeMap,HashSet};
use std::mem::size_of;
use crate::arch::{Component,Direction,Path,TopLevel};
use crate::quantify::Quantifiable;
use crate::ruleset::RuleSet;

/// Per-vertex dynamic routing state: static capacity plus the present-penalty/history-cost
/// fields Pathfinder mutates between sweeps (§4.I).
#[derive(Clone,Debug)]
pub struct RoutingLink
{
	pub capacity: usize,
	pub occupants: HashSet<usize>,
	pub present_penalty: f64,
	pub history_cost: f64,
}

impl RoutingLink
{
	fn new(capacity: usize) -> RoutingLink
	{
		RoutingLink{ capacity, occupants: HashSet::new(), present_penalty: 0.0, history_cost: 0.0 }
	}
	pub fn occupancy(&self) -> usize
	{
		self.occupants.len()
	}
	pub fn is_overused(&self) -> bool
	{
		self.occupancy()>self.capacity
	}
}

/// The directed routing graph: vertices keyed by [`Path`], a successor adjacency list, and one
/// [`RoutingLink`] record per vertex.
#[derive(Debug)]
pub struct RoutingGraph
{
	vertices: Vec<Path>,
	index_of: BTreeMap<Path,usize>,
	successors: Vec<Vec<usize>>,
	predecessors: Vec<Vec<usize>>,
	links: Vec<RoutingLink>,
}

impl RoutingGraph
{
	pub fn build(top: &TopLevel, rules: &dyn RuleSet) -> RoutingGraph
	{
		let mut graph = RoutingGraph{ vertices: Vec::new(), index_of: BTreeMap::new(), successors: Vec::new(), predecessors: Vec::new(), links: Vec::new() };
		for (address,tile) in top.tiles()
		{
			let root = Path::at_address(address.clone(),Vec::new());
			graph.walk(tile,&root,rules);
		}
		graph
	}
	fn vertex_index(&mut self, path: Path, capacity: usize) -> usize
	{
		if let Some(&index) = self.index_of.get(&path)
		{
			return index;
		}
		let index = self.vertices.len();
		self.index_of.insert(path.clone(),index);
		self.vertices.push(path);
		self.successors.push(Vec::new());
		self.predecessors.push(Vec::new());
		self.links.push(RoutingLink::new(capacity));
		index
	}
	fn add_edge(&mut self, from: usize, to: usize)
	{
		if !self.successors[from].contains(&to)
		{
			self.successors[from].push(to);
			self.predecessors[to].push(from);
		}
	}
	fn walk(&mut self, component: &Component, path: &Path, rules: &dyn RuleSet)
	{
		// Fires the construction-time annotation hook for every visited component, mirroring
		// `PathTable::dfs`; the result is discarded here too, the hook exists only for a rule
		// set's own side effects.
		let _ = rules.annotate(component);
		for port in component.ports()
		{
			let port_path = path.child(port.name.clone());
			self.vertex_index(port_path,rules.get_capacity(&path.child(port.name.clone())));
		}
		for link in component.links()
		{
			let link_path = path.child(link.name.clone());
			let link_index = self.vertex_index(link_path,link.capacity);
			for source in &link.sources
			{
				let source_index = self.vertex_index(source.clone(),rules.get_capacity(source));
				self.add_edge(source_index,link_index);
			}
			for sink in &link.sinks
			{
				let sink_index = self.vertex_index(sink.clone(),rules.get_capacity(sink));
				self.add_edge(link_index,sink_index);
			}
		}
		if rules.is_mappable(component)
		{
			let inputs: Vec<_> = component.ports().filter(|p|p.direction==Direction::Input).collect();
			let outputs: Vec<_> = component.ports().filter(|p|p.direction==Direction::Output).collect();
			for input in &inputs
			{
				for output in &outputs
				{
					let through_path = path.child(format!("~through:{}->{}",input.name,output.name));
					let through_index = self.vertex_index(through_path.clone(),rules.get_capacity(&through_path));
					let input_index = self.vertex_index(path.child(input.name.clone()),rules.get_capacity(&path.child(input.name.clone())));
					let output_index = self.vertex_index(path.child(output.name.clone()),rules.get_capacity(&path.child(output.name.clone())));
					self.add_edge(input_index,through_index);
					self.add_edge(through_index,output_index);
				}
			}
		}
		for (name,child) in component.children()
		{
			let child_path = path.child(name.clone());
			self.walk(child,&child_path,rules);
		}
	}
	pub fn num_vertices(&self) -> usize
	{
		self.vertices.len()
	}
	pub fn vertex_path(&self, index: usize) -> &Path
	{
		&self.vertices[index]
	}
	pub fn index_of(&self, path: &Path) -> Option<usize>
	{
		self.index_of.get(path).copied()
	}
	pub fn successors(&self, index: usize) -> &[usize]
	{
		&self.successors[index]
	}
	pub fn predecessors(&self, index: usize) -> &[usize]
	{
		&self.predecessors[index]
	}
	pub fn link(&self, index: usize) -> &RoutingLink
	{
		&self.links[index]
	}
	pub fn link_mut(&mut self, index: usize) -> &mut RoutingLink
	{
		&mut self.links[index]
	}
	/// Base traversal cost of a vertex: uniform across the graph (a unit-delay fabric model); a
	/// rule set wanting weighted wires can fold that weight into `present_penalty` via `annotate`
	/// hooks at the caller level instead.
	pub fn base_cost(&self, _index: usize) -> f64
	{
		1.0
	}
}

impl Quantifiable for RoutingLink
{
	fn total_memory(&self) -> usize
	{
		size_of::<RoutingLink>()+self.occupants.len()*size_of::<usize>()
	}
}

impl Quantifiable for RoutingGraph
{
	fn total_memory(&self) -> usize
	{
		size_of::<RoutingGraph>()
			+self.vertices.len()*size_of::<Path>()
			+self.index_of.len()*(size_of::<Path>()+size_of::<usize>())
			+self.successors.total_memory()
			+self.predecessors.total_memory()
			+self.links.total_memory()
	}
}
