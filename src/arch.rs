/*!

The hierarchical architecture model: [`Component`], [`Port`], [`Link`], and
the addressed root, [`TopLevel`]. Everything else in the crate refers to
architecture elements by [`Path`], never by reference, so the tree can be
owned exclusively by the `TopLevel` (see spec §9, "Cyclic references").

This module is a supplier of structure only: whether a given path is
mappable, whether a port is a source/sink for a task-graph edge, and so on
are all questions answered by a [`crate::ruleset::RuleSet`], never by this
module, keeping the dispatch table the single seam for fabric-specific
behavior.

*/

use std::collections::BTreeMap;
use std::any::Any;
use std::fmt;
use crate::address::{Address,AddressSpace};

/// Direction of a [`Port`].
#[derive(Clone,Copy,Debug,PartialEq,Eq,Hash)]
pub enum Direction
{
	Input,
	Output,
}

impl Direction
{
	/// The direction as seen after crossing a link: Input becomes Output and vice versa.
	/// Used when lifting a child's port into its parent's namespace.
	pub fn inverted(self) -> Direction
	{
		match self
		{
			Direction::Input => Direction::Output,
			Direction::Output => Direction::Input,
		}
	}
}

/// A named endpoint on a [`Component`].
#[derive(Clone,Debug)]
pub struct Port
{
	pub name: String,
	pub direction: Direction,
}

impl Port
{
	pub fn new(name: impl Into<String>, direction: Direction) -> Port
	{
		Port{ name: name.into(), direction }
	}
	/// A copy of this port with its direction inverted, used when lifting it into a parent's namespace.
	pub fn inverted(&self) -> Port
	{
		Port{ name: self.name.clone(), direction: self.direction.inverted() }
	}
}

/// A named connector between port [`Path`]s. Capacity is consumed by the
/// routing graph builder (§4.G) to annotate the corresponding vertex.
#[derive(Clone,Debug)]
pub struct Link
{
	pub name: String,
	pub sources: Vec<Path>,
	pub sinks: Vec<Path>,
	pub capacity: usize,
}

impl Link
{
	pub fn new(name: impl Into<String>, sources: Vec<Path>, sinks: Vec<Path>, capacity: usize) -> Link
	{
		Link{ name: name.into(), sources, sinks, capacity }
	}
}

/// An ordered sequence of instance-name steps terminating at a component, port, or link.
/// Optionally rooted at an [`Address`] when it descends from a [`TopLevel`] tile rather than
/// from another component's child namespace. This is the only currency by which architecture
/// elements are referred to outside of [`Component`]'s own tree.
#[derive(Clone,Debug,PartialEq,Eq,Hash,PartialOrd,Ord)]
pub struct Path
{
	root: Option<Address>,
	steps: Vec<String>,
}

impl Path
{
	pub fn new(root: Option<Address>, steps: Vec<String>) -> Path
	{
		Path{ root, steps }
	}
	pub fn at_address(address: Address, steps: Vec<String>) -> Path
	{
		Path{ root: Some(address), steps }
	}
	pub fn without_address(steps: Vec<String>) -> Path
	{
		Path{ root: None, steps }
	}
	pub fn address(&self) -> Option<&Address>
	{
		self.root.as_ref()
	}
	pub fn steps(&self) -> &[String]
	{
		&self.steps
	}
	/// Append one more step, e.g. descending into a child component.
	pub fn child(&self, step: impl Into<String>) -> Path
	{
		let mut steps = self.steps.clone();
		steps.push(step.into());
		Path{ root: self.root.clone(), steps }
	}
	/// The last step, typically a port or link name.
	pub fn leaf(&self) -> Option<&str>
	{
		self.steps.last().map(|s|s.as_str())
	}
}

impl fmt::Display for Path
{
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
	{
		if let Some(address) = &self.root
		{
			write!(f,"{address}")?;
		}
		for step in &self.steps
		{
			write!(f,"/{step}")?;
		}
		Ok(())
	}
}

/// A heterogeneous, string-keyed bag of opaque values. The core never inspects the contained
/// types; implementers of a [`crate::ruleset::RuleSet`] may stash whatever they need here and
/// downcast it back in their own methods.
#[derive(Default)]
pub struct Metadata
{
	values: BTreeMap<String,Box<dyn Any>>,
}

impl Metadata
{
	pub fn new() -> Metadata
	{
		Metadata::default()
	}
	pub fn insert<T: 'static>(&mut self, key: impl Into<String>, value: T)
	{
		self.values.insert(key.into(),Box::new(value));
	}
	pub fn get<T: 'static>(&self, key: &str) -> Option<&T>
	{
		self.values.get(key).and_then(|v|v.downcast_ref::<T>())
	}
	pub fn contains(&self, key: &str) -> bool
	{
		self.values.contains_key(key)
	}
}

impl fmt::Debug for Metadata
{
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
	{
		write!(f,"Metadata{{{} entries}}",self.values.len())
	}
}

/// A hierarchical node in the architecture tree: a name, an optional primitive tag (e.g. "mux",
/// "lut") consulted by rule sets, child components keyed by instance name, owned ports, owned
/// links, and a port-name -> link-name index built at construction.
#[derive(Debug)]
pub struct Component
{
	pub name: String,
	pub primitive: Option<String>,
	children: BTreeMap<String,Component>,
	ports: BTreeMap<String,Port>,
	links: BTreeMap<String,Link>,
	port_to_link: BTreeMap<String,String>,
	pub metadata: Metadata,
}

impl Component
{
	pub fn new(name: impl Into<String>) -> Component
	{
		Component{
			name: name.into(),
			primitive: None,
			children: BTreeMap::new(),
			ports: BTreeMap::new(),
			links: BTreeMap::new(),
			port_to_link: BTreeMap::new(),
			metadata: Metadata::new(),
		}
	}
	pub fn with_primitive(mut self, primitive: impl Into<String>) -> Component
	{
		self.primitive = Some(primitive.into());
		self
	}
	/// Add a child component, keyed by its instance name. Returns an error string if the name is
	/// already taken, mirroring a `ConstructionError`.
	pub fn add_child(&mut self, instance_name: impl Into<String>, child: Component) -> Result<(),String>
	{
		let instance_name = instance_name.into();
		if self.children.contains_key(&instance_name)
		{
			return Err(format!("duplicate child instance name {instance_name:?} inside component {:?}",self.name));
		}
		self.children.insert(instance_name,child);
		Ok(())
	}
	pub fn add_port(&mut self, port: Port) -> Result<(),String>
	{
		if self.ports.contains_key(&port.name)
		{
			return Err(format!("duplicate port {:?} inside component {:?}",port.name,self.name));
		}
		self.ports.insert(port.name.clone(),port);
		Ok(())
	}
	pub fn add_link(&mut self, link: Link) -> Result<(),String>
	{
		if self.links.contains_key(&link.name)
		{
			return Err(format!("duplicate link {:?} inside component {:?}",link.name,self.name));
		}
		for path in link.sources.iter().chain(link.sinks.iter())
		{
			if let Some(port_name) = path.leaf()
			{
				self.port_to_link.insert(port_name.to_string(),link.name.clone());
			}
		}
		self.links.insert(link.name.clone(),link);
		Ok(())
	}
	pub fn child(&self, instance_name: &str) -> Option<&Component>
	{
		self.children.get(instance_name)
	}
	pub fn children(&self) -> impl Iterator<Item=(&String,&Component)>
	{
		self.children.iter()
	}
	pub fn ports(&self) -> impl Iterator<Item=&Port>
	{
		self.ports.values()
	}
	pub fn port(&self, name: &str) -> Option<&Port>
	{
		self.ports.get(name)
	}
	pub fn links(&self) -> impl Iterator<Item=&Link>
	{
		self.links.values()
	}
	pub fn link(&self, name: &str) -> Option<&Link>
	{
		self.links.get(name)
	}
	/// The link that a given port participates in, if any.
	pub fn link_for_port(&self, port_name: &str) -> Option<&Link>
	{
		self.port_to_link.get(port_name).and_then(|link_name|self.links.get(link_name))
	}
	/// Resolve a relative step path starting from this component, returning the terminal
	/// component if every step names a child.
	pub fn resolve(&self, steps: &[String]) -> Option<&Component>
	{
		let mut current = self;
		for step in steps
		{
			current = current.child(step)?;
		}
		Some(current)
	}
}

/// Root component whose direct children are addressed by [`Address`] rather than by name.
/// Parameterized by dimensionality (via the `AddressSpace`) and by a `RuleSet` tag carried
/// alongside it by the caller (the dispatch table itself lives in [`crate::ruleset`]).
#[derive(Debug)]
pub struct TopLevel
{
	pub name: String,
	space: AddressSpace,
	tiles: BTreeMap<Address,Component>,
}

impl TopLevel
{
	pub fn new(name: impl Into<String>, space: AddressSpace) -> TopLevel
	{
		TopLevel{ name: name.into(), space, tiles: BTreeMap::new() }
	}
	pub fn address_space(&self) -> &AddressSpace
	{
		&self.space
	}
	pub fn dimension(&self) -> usize
	{
		self.space.dimension()
	}
	pub fn set_tile(&mut self, address: Address, component: Component) -> Result<(),String>
	{
		if !self.space.contains(&address)
		{
			return Err(format!("address {address} outside the top-level address space"));
		}
		self.tiles.insert(address,component);
		Ok(())
	}
	pub fn tile(&self, address: &Address) -> Option<&Component>
	{
		self.tiles.get(address)
	}
	pub fn tiles(&self) -> impl Iterator<Item=(&Address,&Component)>
	{
		self.tiles.iter()
	}
	/// Resolve a full [`Path`] (address-rooted) down to its terminal component.
	pub fn resolve(&self, path: &Path) -> Option<&Component>
	{
		let address = path.address()?;
		let tile = self.tile(address)?;
		tile.resolve(path.steps())
	}
}

#[cfg(test)]
mod tests
{
	use super::*;

	fn tiny_top_level() -> TopLevel
	{
		let mut top = TopLevel::new("top",AddressSpace::new(vec![2,1]));
		for address in top.address_space().iter().collect::<Vec<_>>()
		{
			let mut tile = Component::new("tile").with_primitive("tile");
			tile.add_port(Port::new("in",Direction::Input)).unwrap();
			tile.add_port(Port::new("out",Direction::Output)).unwrap();
			top.set_tile(address,tile).unwrap();
		}
		top
	}

	#[test]
	fn resolves_tile_ports()
	{
		let top = tiny_top_level();
		let address = Address::new(vec![1,0]);
		let path = Path::at_address(address.clone(),vec![]);
		let tile = top.resolve(&path).expect("tile must resolve");
		assert!(tile.port("in").is_some());
	}

	#[test]
	fn rejects_duplicate_port()
	{
		let mut component = Component::new("c");
		component.add_port(Port::new("p",Direction::Input)).unwrap();
		assert!(component.add_port(Port::new("p",Direction::Output)).is_err());
	}

	#[test]
	fn rejects_out_of_bounds_tile()
	{
		let mut top = TopLevel::new("top",AddressSpace::new(vec![2,1]));
		let bad_address = Address::new(vec![5,0]);
		assert!(top.set_tile(bad_address,Component::new("x")).is_err());
	}
}
