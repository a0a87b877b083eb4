use crate::cli::utils::flag;
use crate::cli::{switch, CmdContext};
use crate::error::CtlError;
use crate::render::topo::{matrix, sort_topology, TopoView};
use clap::{ArgMatches, Command};
use std::io::Write;

const GET_TOPOLOGY: &str = "getting device topology";

pub fn device_show_cmd<'a>() -> Command<'a> {
    Command::new("device")
        .about("Show device information")
        .arg_required_else_help(true)
        .subcommand(
            Command::new("topology").about("Show device topology").args(&[
                switch("link-weight", "Show link weight between devices").short('w'),
                switch("num-hops", "Show number of hops between devices").short('n'),
                switch("detail", "Show device topology in detail").short('d'),
            ]),
        )
}

fn selected_views(m: &ArgMatches) -> Vec<TopoView> {
    if flag(m, "detail") {
        vec![TopoView::LinkType, TopoView::LinkWeight, TopoView::NumHops]
    } else if flag(m, "link-weight") {
        vec![TopoView::LinkWeight]
    } else if flag(m, "num-hops") {
        vec![TopoView::NumHops]
    } else {
        vec![TopoView::LinkType]
    }
}

pub async fn show_device_topology(ctx: &mut CmdContext<'_>, m: &ArgMatches) -> Result<(), CtlError> {
    let views = selected_views(m);

    let conn = ctx.connect().await?;
    let mut resp = conn
        .call(GET_TOPOLOGY, conn.api().device_topology_get())
        .await?;

    sort_topology(&mut resp.device_topology);
    for view in views {
        matrix(ctx.out, &resp.device_topology, view)?;
    }
    writeln!(ctx.out)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::agent_rpc::fake::{FakeAgent, FakeConnector, Probe};
    use crate::cli::run_fake;
    use model::topo::{Device, DeviceTopology, IoLink, IoLinkType, PeerDevice};

    fn topology() -> Vec<DeviceTopology> {
        ["GPU1", "GPU0"]
            .iter()
            .map(|name| DeviceTopology {
                device: Device { name: name.to_string() },
                peer_device: vec![PeerDevice {
                    peer_device: Device {
                        name: if *name == "GPU0" { "GPU1" } else { "GPU0" }.to_string(),
                    },
                    connection: IoLink {
                        link_type: IoLinkType::Xgmi,
                    },
                    weight: 15,
                    num_hops: 1,
                }],
            })
            .collect()
    }

    #[tokio::test]
    async fn default_view_is_link_type() {
        let probe = Probe::default();
        let mut agent = FakeAgent::new(&probe);
        agent.topology.device_topology = topology();
        let (res, out) = run_fake(&FakeConnector::ready(agent), &["show", "device", "topology"]).await;
        assert!(res.is_ok(), "{:?}", res);
        assert!(out.contains("Link type between two devices"));
        assert!(!out.contains("Number of hops"));
        assert_eq!(probe.methods(), vec!["Topo.DeviceTopologyGet"]);
    }

    #[tokio::test]
    async fn detail_shows_every_matrix() {
        let probe = Probe::default();
        let mut agent = FakeAgent::new(&probe);
        agent.topology.device_topology = topology();
        let (res, out) =
            run_fake(&FakeConnector::ready(agent), &["show", "device", "topology", "-d"]).await;
        assert!(res.is_ok(), "{:?}", res);
        assert!(out.contains("Link type between two devices"));
        assert!(out.contains("Link weight between two devices"));
        assert!(out.contains("Number of hops between two devices"));
        assert!(out.find("GPU0").unwrap() < out.find("GPU1").unwrap());
    }
}
