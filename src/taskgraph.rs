/*!

The dataflow task graph to be mapped onto a [`crate::arch::TopLevel`]: named
task nodes, and edges naming their source and sink task sets (so a single
edge can already model a fanout/fanin channel before it becomes an
[`crate::placement::state::SAChannel`]).

*/

use std::collections::BTreeMap;
use crate::arch::Metadata;

/// A task to be placed onto the architecture.
#[derive(Debug)]
pub struct TaskgraphNode
{
	pub name: String,
	pub metadata: Metadata,
}

impl TaskgraphNode
{
	pub fn new(name: impl Into<String>) -> TaskgraphNode
	{
		TaskgraphNode{ name: name.into(), metadata: Metadata::new() }
	}
}

/// A dataflow edge. `sources`/`sinks` are task names rather than indices so a `Taskgraph` can be
/// built incrementally before nodes are frozen into a dense index space.
#[derive(Debug)]
pub struct TaskgraphEdge
{
	pub sources: Vec<String>,
	pub sinks: Vec<String>,
	pub metadata: Metadata,
}

impl TaskgraphEdge
{
	pub fn point_to_point(source: impl Into<String>, sink: impl Into<String>) -> TaskgraphEdge
	{
		TaskgraphEdge{ sources: vec![source.into()], sinks: vec![sink.into()], metadata: Metadata::new() }
	}
	pub fn new(sources: Vec<String>, sinks: Vec<String>) -> TaskgraphEdge
	{
		TaskgraphEdge{ sources, sinks, metadata: Metadata::new() }
	}
	pub fn is_point_to_point(&self) -> bool
	{
		self.sources.len()==1 && self.sinks.len()==1
	}
}

/// A frozen dataflow task graph: name-keyed nodes in insertion order, an edge list, and
/// precomputed in/out adjacency lists built once at construction (§3 Data Model), so that
/// the hot placement/routing loops never have to scan the edge list to find a node's channels.
#[derive(Debug)]
pub struct Taskgraph
{
	names: Vec<String>,
	index_of: BTreeMap<String,usize>,
	nodes: Vec<TaskgraphNode>,
	edges: Vec<TaskgraphEdge>,
	/// For each node index, the list of edge indices where it appears as a source.
	out_adjacency: Vec<Vec<usize>>,
	/// For each node index, the list of edge indices where it appears as a sink.
	in_adjacency: Vec<Vec<usize>>,
}

impl Taskgraph
{
	pub fn build(nodes: Vec<TaskgraphNode>, edges: Vec<TaskgraphEdge>) -> Result<Taskgraph,String>
	{
		let mut names = Vec::with_capacity(nodes.len());
		let mut index_of = BTreeMap::new();
		for (index,node) in nodes.iter().enumerate()
		{
			if index_of.insert(node.name.clone(),index).is_some()
			{
				return Err(format!("duplicate task node name {:?}",node.name));
			}
			names.push(node.name.clone());
		}
		let mut out_adjacency = vec![Vec::new();nodes.len()];
		let mut in_adjacency = vec![Vec::new();nodes.len()];
		for (edge_index,edge) in edges.iter().enumerate()
		{
			for source in &edge.sources
			{
				let &node_index = index_of.get(source).ok_or_else(||format!("edge references unknown source task {source:?}"))?;
				out_adjacency[node_index].push(edge_index);
			}
			for sink in &edge.sinks
			{
				let &node_index = index_of.get(sink).ok_or_else(||format!("edge references unknown sink task {sink:?}"))?;
				in_adjacency[node_index].push(edge_index);
			}
		}
		Ok(Taskgraph{ names, index_of, nodes, edges, out_adjacency, in_adjacency })
	}
	pub fn num_nodes(&self) -> usize
	{
		self.nodes.len()
	}
	pub fn num_edges(&self) -> usize
	{
		self.edges.len()
	}
	pub fn node(&self, index: usize) -> &TaskgraphNode
	{
		&self.nodes[index]
	}
	pub fn node_index(&self, name: &str) -> Option<usize>
	{
		self.index_of.get(name).copied()
	}
	pub fn node_name(&self, index: usize) -> &str
	{
		&self.names[index]
	}
	pub fn edge(&self, index: usize) -> &TaskgraphEdge
	{
		&self.edges[index]
	}
	pub fn edges(&self) -> impl Iterator<Item=(usize,&TaskgraphEdge)>
	{
		self.edges.iter().enumerate()
	}
	/// Edges where `node_index` appears as a source.
	pub fn out_edges(&self, node_index: usize) -> &[usize]
	{
		&self.out_adjacency[node_index]
	}
	/// Edges where `node_index` appears as a sink.
	pub fn in_edges(&self, node_index: usize) -> &[usize]
	{
		&self.in_adjacency[node_index]
	}
}

#[cfg(test)]
mod tests
{
	use super::*;

	#[test]
	fn adjacency_is_precomputed()
	{
		let nodes = vec![TaskgraphNode::new("a"),TaskgraphNode::new("b"),TaskgraphNode::new("c")];
		let edges = vec![TaskgraphEdge::point_to_point("a","b"),TaskgraphEdge::point_to_point("b","c")];
		let graph = Taskgraph::build(nodes,edges).unwrap();
		assert_eq!(graph.out_edges(0),&[0]);
		assert_eq!(graph.in_edges(1),&[0]);
		assert_eq!(graph.out_edges(1),&[1]);
		assert_eq!(graph.in_edges(2),&[1]);
	}

	#[test]
	fn rejects_duplicate_names()
	{
		let nodes = vec![TaskgraphNode::new("a"),TaskgraphNode::new("a")];
		assert!(Taskgraph::build(nodes,vec![]).is_err());
	}

	#[test]
	fn rejects_dangling_edge()
	{
		let nodes = vec![TaskgraphNode::new("a")];
		let edges = vec![TaskgraphEdge::point_to_point("a","ghost")];
		assert!(Taskgraph::build(nodes,edges).is_err());
	}
}
