//! Built-in rollout plan
//!
//! Deploys the registry modules and wires them together: the name wrapper
//! becomes a controller of the `.eth` registrar and is advertised on the
//! `.eth` resolver, the reverse registrar takes over `addr.reverse`, and
//! DNS top-level domains are handed to the DNS registrar.

use crate::stage::Stage;
use ensd_types::{
    Address, AddressRef, ConstructorArg, Declaration, DesiredBinding, InterfaceSource, NameError,
    NamespaceNode, OwnershipRoute,
};

/// Address the name wrapper is constructed with as its upgrade target
pub const WRAPPER_UPGRADE_ADDRESS: Address = Address::from_bytes([
    0x57, 0xf1, 0x88, 0x7a, 0x8b, 0xf1, 0x9b, 0x14, 0xfc, 0x0d, 0xf6, 0xfd, 0x9b, 0x2a, 0xcc, 0x9a,
    0xf1, 0x47, 0xea, 0x85,
]);

/// Metadata endpoint passed to the static metadata service
pub const METADATA_URL: &str = "https://ens.domains";

/// DNS top-level domains enabled per network
pub fn tld_map() -> Vec<(&'static str, Vec<&'static str>)> {
    vec![
        ("mainnet", vec!["xyz"]),
        ("ropsten", vec!["xyz"]),
        ("localhost", vec!["xyz"]),
        ("hardhat", vec!["xyz"]),
        ("goerli", vec!["xyz"]),
        ("bsc-testnet", vec!["exposed", "joy", "market", "netbank"]),
    ]
}

fn module(name: &str) -> ConstructorArg {
    ConstructorArg::Address(AddressRef::module(name))
}

/// The standard plan, in declaration order
pub fn standard_plan() -> Result<Vec<Stage>, NameError> {
    let eth = NamespaceNode::new("eth")?;

    let reverse_setup = Declaration::everywhere(vec![
        DesiredBinding::owner(
            NamespaceNode::new("reverse")?,
            AddressRef::account("deployer"),
            OwnershipRoute::Root,
        ),
        DesiredBinding::owner(
            NamespaceNode::new("addr.reverse")?,
            AddressRef::module("ReverseRegistrar"),
            OwnershipRoute::Registry,
        ),
    ]);

    let wrapper_setup = Declaration::everywhere(vec![
        DesiredBinding::controller(
            eth.clone(),
            AddressRef::module("BaseRegistrarImplementation"),
            AddressRef::module("NameWrapper"),
        ),
        DesiredBinding::interface(
            eth,
            InterfaceSource::Artifact("INameWrapper".into()),
            AddressRef::module("NameWrapper"),
        ),
    ]);

    let mut tlds = Declaration::new();
    for (network, names) in tld_map() {
        let bindings = names
            .into_iter()
            .map(|tld| {
                Ok(DesiredBinding::owner(
                    NamespaceNode::new(tld)?,
                    AddressRef::module("DNSRegistrar"),
                    OwnershipRoute::Registrar(AddressRef::module("DNSRegistrar")),
                ))
            })
            .collect::<Result<Vec<_>, NameError>>()?;
        tlds = tlds.with_network(network, bindings);
    }

    Ok(vec![
        Stage::deploy("registry", "ENSRegistry"),
        Stage::deploy("root", "Root")
            .with_args(vec![module("ENSRegistry")])
            .after("registry"),
        Stage::deploy("base-registrar", "BaseRegistrarImplementation")
            .with_args(vec![module("ENSRegistry"), ConstructorArg::Node("eth".into())])
            .after("registry"),
        Stage::deploy("static-metadata", "StaticMetadataService")
            .with_args(vec![ConstructorArg::Str(METADATA_URL.into())]),
        Stage::deploy("owned-resolver", "OwnedResolver"),
        Stage::deploy("dnssec-oracle", "DNSSECImpl").with_args(vec![ConstructorArg::Bytes(Vec::new())]),
        Stage::deploy("dns-registrar", "DNSRegistrar")
            .with_args(vec![module("DNSSECImpl"), module("ENSRegistry")])
            .after("dnssec-oracle")
            .after("registry"),
        Stage::deploy("reverse-registrar", "ReverseRegistrar")
            .with_args(vec![module("ENSRegistry")])
            .after("root"),
        Stage::reconcile("reverse-registrar-setup", reverse_setup)
            .after("reverse-registrar")
            .only_if_fresh("ReverseRegistrar"),
        Stage::deploy("name-wrapper", "NameWrapper")
            .with_args(vec![
                module("ENSRegistry"),
                ConstructorArg::Address(AddressRef::Literal(WRAPPER_UPGRADE_ADDRESS)),
                module("StaticMetadataService"),
            ])
            .after("static-metadata")
            .after("registry")
            .after("reverse-registrar")
            .after("owned-resolver"),
        Stage::reconcile("name-wrapper-setup", wrapper_setup)
            .after("name-wrapper")
            .after("base-registrar")
            .only_if_fresh("NameWrapper"),
        Stage::reconcile("dns-tlds", tlds)
            .after("dns-registrar")
            .after("registry"),
    ])
}
