use crate::error::CtlError;
use model::topo::{DeviceTopology, PeerDevice};
use std::io::Write;
use tabled::builder::Builder;
use tabled::settings::style::Style;

/// Which peer attribute a topology matrix shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopoView {
    LinkType,
    LinkWeight,
    NumHops,
}

impl TopoView {
    fn title(self) -> &'static str {
        match self {
            TopoView::LinkType => "Link type between two devices",
            TopoView::LinkWeight => "Link weight between two devices",
            TopoView::NumHops => "Number of hops between two devices",
        }
    }

    fn cell(self, peer: &PeerDevice) -> String {
        match self {
            TopoView::LinkType => peer.connection.link_type.to_string(),
            TopoView::LinkWeight => peer.weight.to_string(),
            TopoView::NumHops => peer.num_hops.to_string(),
        }
    }
}

/// Orders devices and each device's peers by the `GPU<n>` suffix.
pub fn sort_topology(topology: &mut [DeviceTopology]) {
    topology.sort_by_key(|t| t.device.gpu_index());
    for device in topology.iter_mut() {
        device.peer_device.sort_by_key(|p| p.peer_device.gpu_index());
    }
}

pub fn matrix(out: &mut dyn Write, topology: &[DeviceTopology], view: TopoView) -> Result<(), CtlError> {
    writeln!(out, "\n{:-^137}\n", format!(" {} ", view.title()))?;

    let names: Vec<&str> = topology.iter().map(|t| t.device.name.as_str()).collect();
    let mut builder = Builder::new();
    let mut header = vec![String::new()];
    header.extend(names.iter().map(|n| n.to_string()));
    builder.set_header(header);

    for device in topology {
        let mut row = vec![device.device.name.clone()];
        for name in &names {
            let cell = if *name == device.device.name {
                "X".to_string()
            } else {
                device
                    .peer_device
                    .iter()
                    .find(|p| p.peer_device.name == *name)
                    .map(|p| view.cell(p))
                    .unwrap_or_else(|| "-".to_string())
            };
            row.push(cell);
        }
        builder.push_record(row);
    }
    writeln!(out, "{}", builder.build().with(Style::ascii()))?;
    Ok(())
}
