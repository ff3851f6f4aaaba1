
//! Order the channels of a part the way the host presents them:
//! grouped by layer, and within each layer by the conventional role of the channel.

use std::cmp::Ordering;
use crate::meta::attribute::{ChannelList, SampleType, Text};
use crate::error::*;


/// Suffix priorities for ordinary layers.
const DEFAULT_ORDER: [&str; 20] = [
    "R", "Red", "G", "Green", "B", "Blue", "Y", "real", "imag",
    "A", "Alpha", "AR", "RA", "AG", "GA", "AB", "BA", "Z", "Depth", "Zback",
];

/// Suffix priorities for layers that contain positions or normals.
const POSITION_ORDER: [&str; 21] = [
    "R", "Red", "G", "Green", "B", "Blue", "X", "Y", "Z", "real", "imag",
    "A", "Alpha", "AR", "RA", "AG", "GA", "AB", "BA", "Depth", "Zback",
];

/// The rank of suffixes that are not in the active priority list.
const UNLISTED: usize = 10_000;


/// Split a full channel name at the last dot.
/// The layer keeps the trailing dot, so that `a.b.R` has the layer `a.b.` and the suffix `R`.
pub fn split_name(full_name: &str) -> (&str, &str) {
    match full_name.rfind('.') {
        Some(dot) => full_name.split_at(dot + 1),
        None => ("", full_name),
    }
}

fn rank(suffix: &str, order: &[&str]) -> usize {
    order.iter().position(|name| name.eq_ignore_ascii_case(suffix)).unwrap_or(UNLISTED)
}

fn compare_suffixes(a: &str, b: &str) -> Ordering {
    let lower_a = a.bytes().map(|byte| byte.to_ascii_lowercase());
    let lower_b = b.bytes().map(|byte| byte.to_ascii_lowercase());
    lower_a.cmp(lower_b).then_with(|| a.cmp(b))
}

/// Compute the presentation order of the channel names.
/// Returns the indices into `names`, in presentation order.
/// Channels with equal layer and suffix keep their relative order.
pub fn canonical_order<S: AsRef<str>>(names: &[S]) -> Vec<usize> {
    let split: Vec<(&str, &str)> = names.iter().map(|name| split_name(name.as_ref())).collect();

    let mut order: Vec<usize> = (0 .. names.len()).collect();
    order.sort_by(|&a, &b| split[a].0.cmp(split[b].0));

    let mut ranks = vec![ UNLISTED; names.len() ];

    for layer in order.chunk_by_mut(|&a, &b| split[a].0 == split[b].0) {
        let has_suffix = |wanted: &str| layer.iter()
            .any(|&index| split[index].1.eq_ignore_ascii_case(wanted));

        let is_position = has_suffix("X") && (has_suffix("Y") || has_suffix("Z"));
        let priorities: &[&str] = if is_position { &POSITION_ORDER } else { &DEFAULT_ORDER };

        for &index in layer.iter() {
            ranks[index] = rank(split[index].1, priorities);
        }

        layer.sort_by(|&a, &b| {
            ranks[a].cmp(&ranks[b]).then_with(|| compare_suffixes(split[a].1, split[b].1))
        });
    }

    order
}


/// The channels of a part in presentation order.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelInventory {

    /// The exact channel names as stored in the file, in presentation order.
    pub names: Vec<Text>,

    /// The sample type of each channel, in presentation order.
    pub sample_types: Vec<SampleType>,

    /// The widest sample type.
    pub format: SampleType,

    /// Whether all channels have the same sample type.
    pub uniform: bool,

    /// Index of the first channel named `A` or `Alpha`.
    pub alpha_channel: Option<usize>,

    /// Index of the first channel named `Z` or `Depth`.
    pub z_channel: Option<usize>,
}

impl ChannelInventory {

    /// Sort the channels of the file into presentation order.
    /// Fails for empty lists and for subsampled channels.
    pub fn from_channels(channels: &ChannelList) -> Result<Self> {
        let first = channels.list.first()
            .ok_or_else(|| Error::invalid("no channels found"))?;

        let names: Vec<String> = channels.list.iter()
            .map(|channel| channel.name.to_string()).collect();

        let order = canonical_order(&names);

        let mut inventory = ChannelInventory {
            names: Vec::with_capacity(order.len()),
            sample_types: Vec::with_capacity(order.len()),
            format: first.sample_type,
            uniform: true,
            alpha_channel: None,
            z_channel: None,
        };

        for (position, &index) in order.iter().enumerate() {
            let channel = &channels.list[index];
            let suffix = split_name(&names[index]).1;

            if channel.sampling.x() != 1 || channel.sampling.y() != 1 {
                return Err(Error::unsupported(format!(
                    "Subsampled channels are not supported (channel \"{}\" has sampling {},{}).",
                    names[index], channel.sampling.x(), channel.sampling.y()
                )));
            }

            inventory.format = widest(inventory.format, channel.sample_type);
            inventory.uniform &= channel.sample_type == first.sample_type;

            let is = |wanted: &str| suffix.eq_ignore_ascii_case(wanted);

            if inventory.alpha_channel.is_none() && (is("A") || is("Alpha")) {
                inventory.alpha_channel = Some(position);
            }

            if inventory.z_channel.is_none() && (is("Z") || is("Depth")) {
                inventory.z_channel = Some(position);
            }

            inventory.names.push(channel.name.clone());
            inventory.sample_types.push(channel.sample_type);
        }

        Ok(inventory)
    }

    /// The channel names, converted to strings.
    pub fn name_strings(&self) -> Vec<String> {
        self.names.iter().map(|name| name.to_string()).collect()
    }
}

/// Merge two sample types, preferring unsigned integers, then floats, then halfs.
fn widest(a: SampleType, b: SampleType) -> SampleType {
    fn precedence(sample_type: SampleType) -> u8 {
        match sample_type {
            SampleType::U32 => 2,
            SampleType::F32 => 1,
            SampleType::F16 => 0,
        }
    }

    if precedence(b) > precedence(a) { b } else { a }
}
