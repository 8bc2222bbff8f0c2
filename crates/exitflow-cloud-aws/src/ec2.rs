//! EC2 node backend
//!
//! The ephemeral family on AWS: a tagged VPC stack (VPC, subnet, internet
//! gateway, default route) and `t4g.nano` instances per region, all keyed
//! by the `Project`/`Type`/`Region` tag triple.

use async_trait::async_trait;
use aws_sdk_ec2 as ec2;
use aws_sdk_ec2::types::{
    AttributeBooleanValue, Filter, InstanceType, IpPermission, IpRange, ResourceType, Tag,
    TagSpecification,
};
use chrono::DateTime;

use exitflow_core::NodeInfo;
use exitflow_node::{
    INSTANCE_TYPE, LaunchSpec, Network, NodeBackend, NodeError, Result, TAG_PROJECT_KEY,
    TAG_PROJECT_VALUE, TAG_REGION_KEY, TAG_TYPE_KEY, TAG_TYPE_VALUE,
};

pub struct AwsNodeBackend {
    ec2: ec2::Client,
    aws_region: String,
}

fn api_error<E>(op: &'static str, err: E) -> NodeError
where
    E: std::error::Error + Send + Sync + 'static,
{
    NodeError::api(op, format!("{}", ec2::error::DisplayErrorContext(err)))
}

/// Filters selecting our ephemeral resources; adds the `Region` tag when a
/// friendly name is given.
fn ephemeral_filters(region: Option<&str>) -> Vec<Filter> {
    let mut filters = vec![
        Filter::builder()
            .name(format!("tag:{TAG_PROJECT_KEY}"))
            .values(TAG_PROJECT_VALUE)
            .build(),
        Filter::builder()
            .name(format!("tag:{TAG_TYPE_KEY}"))
            .values(TAG_TYPE_VALUE)
            .build(),
    ];
    if let Some(region) = region {
        filters.push(
            Filter::builder()
                .name(format!("tag:{TAG_REGION_KEY}"))
                .values(region)
                .build(),
        );
    }
    filters
}

/// The full ephemeral tag set for created resources.
fn ephemeral_tags(name: &str, region: &str) -> Vec<Tag> {
    vec![
        Tag::builder().key("Name").value(name).build(),
        Tag::builder()
            .key(TAG_PROJECT_KEY)
            .value(TAG_PROJECT_VALUE)
            .build(),
        Tag::builder().key(TAG_TYPE_KEY).value(TAG_TYPE_VALUE).build(),
        Tag::builder().key(TAG_REGION_KEY).value(region).build(),
    ]
}

fn tag_spec(resource_type: ResourceType, name: &str, region: &str) -> TagSpecification {
    TagSpecification::builder()
        .resource_type(resource_type)
        .set_tags(Some(ephemeral_tags(name, region)))
        .build()
}

impl AwsNodeBackend {
    pub async fn new(aws_region: &str) -> Self {
        let config = crate::load_config(aws_region).await;
        Self::from_config(&config, aws_region)
    }

    pub fn from_config(config: &aws_config::SdkConfig, aws_region: &str) -> Self {
        Self {
            ec2: ec2::Client::new(config),
            aws_region: aws_region.to_string(),
        }
    }

    fn node_info(&self, instance: &ec2::types::Instance) -> NodeInfo {
        let friendly_region = instance
            .tags
            .as_deref()
            .unwrap_or_default()
            .iter()
            .find(|tag| tag.key.as_deref() == Some(TAG_REGION_KEY))
            .and_then(|tag| tag.value.clone())
            .unwrap_or_default();

        let launch_time = instance
            .launch_time
            .and_then(|time| DateTime::from_timestamp(time.secs(), time.subsec_nanos()))
            .unwrap_or_default();

        NodeInfo {
            instance_id: instance.instance_id.clone().unwrap_or_default(),
            region: self.aws_region.clone(),
            friendly_region: friendly_region.clone(),
            state: instance
                .state
                .as_ref()
                .and_then(|state| state.name.as_ref())
                .map(|name| name.as_str().to_string())
                .unwrap_or_default(),
            public_ip: instance.public_ip_address.clone(),
            private_ip: instance.private_ip_address.clone(),
            launch_time,
            instance_type: instance
                .instance_type
                .as_ref()
                .map(|ty| ty.as_str().to_string())
                .unwrap_or_default(),
            tailscale_hostname: (!friendly_region.is_empty())
                .then(|| format!("exit-{friendly_region}")),
        }
    }

    /// Find the tagged subnet inside a VPC.
    async fn find_subnet(&self, vpc_id: &str) -> Result<String> {
        let mut filters = vec![Filter::builder().name("vpc-id").values(vpc_id).build()];
        filters.extend(ephemeral_filters(None));

        let output = self
            .ec2
            .describe_subnets()
            .set_filters(Some(filters))
            .send()
            .await
            .map_err(|err| api_error("DescribeSubnets", err.into_service_error()))?;

        output
            .subnets
            .unwrap_or_default()
            .into_iter()
            .find_map(|subnet| subnet.subnet_id)
            .ok_or_else(|| NodeError::SubnetNotFound(vpc_id.to_string()))
    }
}

#[async_trait]
impl NodeBackend for AwsNodeBackend {
    async fn find_network(&self, region: &str) -> Result<Option<Network>> {
        let output = self
            .ec2
            .describe_vpcs()
            .set_filters(Some(ephemeral_filters(Some(region))))
            .send()
            .await
            .map_err(|err| api_error("DescribeVpcs", err.into_service_error()))?;

        let Some(vpc_id) = output
            .vpcs
            .unwrap_or_default()
            .into_iter()
            .find_map(|vpc| vpc.vpc_id)
        else {
            return Ok(None);
        };

        let subnet_id = self.find_subnet(&vpc_id).await?;
        Ok(Some(Network { vpc_id, subnet_id }))
    }

    async fn create_network(&self, region: &str) -> Result<Network> {
        let vpc_output = self
            .ec2
            .create_vpc()
            .cidr_block("10.0.0.0/16")
            .tag_specifications(tag_spec(
                ResourceType::Vpc,
                &format!("exitflow-vpc-{region}"),
                region,
            ))
            .send()
            .await
            .map_err(|err| api_error("CreateVpc", err.into_service_error()))?;

        let vpc_id = vpc_output
            .vpc
            .and_then(|vpc| vpc.vpc_id)
            .ok_or_else(|| NodeError::api("CreateVpc", "response carried no VPC id"))?;

        // Subnet in the first available zone.
        let zones = self
            .ec2
            .describe_availability_zones()
            .filters(Filter::builder().name("state").values("available").build())
            .send()
            .await
            .map_err(|err| api_error("DescribeAvailabilityZones", err.into_service_error()))?;

        let zone_name = zones
            .availability_zones
            .unwrap_or_default()
            .into_iter()
            .find_map(|zone| zone.zone_name)
            .ok_or(NodeError::NoAvailabilityZone)?;

        let subnet_output = self
            .ec2
            .create_subnet()
            .vpc_id(&vpc_id)
            .cidr_block("10.0.1.0/24")
            .availability_zone(zone_name)
            .tag_specifications(tag_spec(
                ResourceType::Subnet,
                &format!("exitflow-subnet-{region}"),
                region,
            ))
            .send()
            .await
            .map_err(|err| api_error("CreateSubnet", err.into_service_error()))?;

        let subnet_id = subnet_output
            .subnet
            .and_then(|subnet| subnet.subnet_id)
            .ok_or_else(|| NodeError::api("CreateSubnet", "response carried no subnet id"))?;

        // Internet gateway + default route out.
        let igw_output = self
            .ec2
            .create_internet_gateway()
            .tag_specifications(tag_spec(
                ResourceType::InternetGateway,
                &format!("exitflow-igw-{region}"),
                region,
            ))
            .send()
            .await
            .map_err(|err| api_error("CreateInternetGateway", err.into_service_error()))?;

        let igw_id = igw_output
            .internet_gateway
            .and_then(|igw| igw.internet_gateway_id)
            .ok_or_else(|| {
                NodeError::api("CreateInternetGateway", "response carried no gateway id")
            })?;

        self.ec2
            .attach_internet_gateway()
            .internet_gateway_id(&igw_id)
            .vpc_id(&vpc_id)
            .send()
            .await
            .map_err(|err| api_error("AttachInternetGateway", err.into_service_error()))?;

        let route_tables = self
            .ec2
            .describe_route_tables()
            .filters(Filter::builder().name("vpc-id").values(&vpc_id).build())
            .send()
            .await
            .map_err(|err| api_error("DescribeRouteTables", err.into_service_error()))?;

        let route_table_id = route_tables
            .route_tables
            .unwrap_or_default()
            .into_iter()
            .find_map(|table| table.route_table_id)
            .ok_or_else(|| NodeError::api("DescribeRouteTables", "no route table for the VPC"))?;

        self.ec2
            .create_route()
            .route_table_id(route_table_id)
            .destination_cidr_block("0.0.0.0/0")
            .gateway_id(&igw_id)
            .send()
            .await
            .map_err(|err| api_error("CreateRoute", err.into_service_error()))?;

        // Instances need public addresses to reach the tailnet.
        self.ec2
            .modify_subnet_attribute()
            .subnet_id(&subnet_id)
            .map_public_ip_on_launch(AttributeBooleanValue::builder().value(true).build())
            .send()
            .await
            .map_err(|err| api_error("ModifySubnetAttribute", err.into_service_error()))?;

        Ok(Network { vpc_id, subnet_id })
    }

    async fn find_security_group(&self, vpc_id: &str, region: &str) -> Result<Option<String>> {
        let mut filters = vec![Filter::builder().name("vpc-id").values(vpc_id).build()];
        filters.extend(ephemeral_filters(Some(region)));

        let output = self
            .ec2
            .describe_security_groups()
            .set_filters(Some(filters))
            .send()
            .await
            .map_err(|err| api_error("DescribeSecurityGroups", err.into_service_error()))?;

        Ok(output
            .security_groups
            .unwrap_or_default()
            .into_iter()
            .find_map(|group| group.group_id))
    }

    async fn create_security_group(&self, vpc_id: &str, region: &str) -> Result<String> {
        let name = format!("exitflow-sg-{region}");
        let output = self
            .ec2
            .create_security_group()
            .group_name(&name)
            .description("ExitFlow ephemeral exit node security group")
            .vpc_id(vpc_id)
            .tag_specifications(tag_spec(ResourceType::SecurityGroup, &name, region))
            .send()
            .await
            .map_err(|err| api_error("CreateSecurityGroup", err.into_service_error()))?;

        let group_id = output
            .group_id
            .ok_or_else(|| NodeError::api("CreateSecurityGroup", "response carried no group id"))?;

        // WireGuard, plus SSH for debugging a live node.
        self.ec2
            .authorize_security_group_ingress()
            .group_id(&group_id)
            .ip_permissions(
                IpPermission::builder()
                    .ip_protocol("udp")
                    .from_port(41641)
                    .to_port(41641)
                    .ip_ranges(IpRange::builder().cidr_ip("0.0.0.0/0").build())
                    .build(),
            )
            .ip_permissions(
                IpPermission::builder()
                    .ip_protocol("tcp")
                    .from_port(22)
                    .to_port(22)
                    .ip_ranges(IpRange::builder().cidr_ip("0.0.0.0/0").build())
                    .build(),
            )
            .send()
            .await
            .map_err(|err| api_error("AuthorizeSecurityGroupIngress", err.into_service_error()))?;

        Ok(group_id)
    }

    async fn latest_image(&self) -> Result<String> {
        let output = self
            .ec2
            .describe_images()
            .owners("amazon")
            .filters(
                Filter::builder()
                    .name("name")
                    .values("al2023-ami-*-arm64")
                    .build(),
            )
            .filters(Filter::builder().name("state").values("available").build())
            .filters(
                Filter::builder()
                    .name("architecture")
                    .values("arm64")
                    .build(),
            )
            .send()
            .await
            .map_err(|err| api_error("DescribeImages", err.into_service_error()))?;

        // Most recent by creation date.
        output
            .images
            .unwrap_or_default()
            .into_iter()
            .filter_map(|image| {
                let created = image
                    .creation_date
                    .as_deref()
                    .and_then(|date| DateTime::parse_from_rfc3339(date).ok())?;
                Some((created, image.image_id?))
            })
            .max_by_key(|(created, _)| *created)
            .map(|(_, image_id)| image_id)
            .ok_or(NodeError::NoImageFound)
    }

    async fn launch_node(&self, spec: &LaunchSpec) -> Result<NodeInfo> {
        let output = self
            .ec2
            .run_instances()
            .image_id(&spec.image_id)
            .instance_type(InstanceType::from(INSTANCE_TYPE))
            .min_count(1)
            .max_count(1)
            .subnet_id(&spec.subnet_id)
            .security_group_ids(&spec.security_group_id)
            .user_data(&spec.user_data)
            .tag_specifications(tag_spec(
                ResourceType::Instance,
                &format!("exitflow-exit-{}", spec.region),
                &spec.region,
            ))
            .send()
            .await
            .map_err(|err| api_error("RunInstances", err.into_service_error()))?;

        let instance = output
            .instances
            .unwrap_or_default()
            .into_iter()
            .next()
            .ok_or_else(|| NodeError::api("RunInstances", "response carried no instance"))?;

        Ok(self.node_info(&instance))
    }

    async fn list_nodes(&self) -> Result<Vec<NodeInfo>> {
        let output = self
            .ec2
            .describe_instances()
            .set_filters(Some(ephemeral_filters(None)))
            .filters(
                Filter::builder()
                    .name("instance-state-name")
                    .values("pending")
                    .values("running")
                    .values("stopping")
                    .values("stopped")
                    .build(),
            )
            .send()
            .await
            .map_err(|err| api_error("DescribeInstances", err.into_service_error()))?;

        let nodes = output
            .reservations
            .unwrap_or_default()
            .into_iter()
            .flat_map(|reservation| reservation.instances.unwrap_or_default())
            .map(|instance| self.node_info(&instance))
            .collect();

        Ok(nodes)
    }

    async fn terminate_nodes(&self, instance_ids: &[String]) -> Result<()> {
        self.ec2
            .terminate_instances()
            .set_instance_ids(Some(instance_ids.to_vec()))
            .send()
            .await
            .map_err(|err| api_error("TerminateInstances", err.into_service_error()))?;
        Ok(())
    }

    async fn list_network_ids(&self) -> Result<Vec<String>> {
        let output = self
            .ec2
            .describe_vpcs()
            .set_filters(Some(ephemeral_filters(None)))
            .send()
            .await
            .map_err(|err| api_error("DescribeVpcs", err.into_service_error()))?;

        Ok(output
            .vpcs
            .unwrap_or_default()
            .into_iter()
            .filter_map(|vpc| vpc.vpc_id)
            .collect())
    }

    async fn delete_network(&self, vpc_id: &str) -> Result<()> {
        // Gateways first. Individual detach/delete failures are tolerated;
        // the VPC delete below will fail loudly if anything still hangs
        // off it.
        if let Ok(output) = self
            .ec2
            .describe_internet_gateways()
            .filters(
                Filter::builder()
                    .name("attachment.vpc-id")
                    .values(vpc_id)
                    .build(),
            )
            .send()
            .await
        {
            for igw_id in output
                .internet_gateways
                .unwrap_or_default()
                .into_iter()
                .filter_map(|igw| igw.internet_gateway_id)
            {
                if let Err(err) = self
                    .ec2
                    .detach_internet_gateway()
                    .internet_gateway_id(&igw_id)
                    .vpc_id(vpc_id)
                    .send()
                    .await
                {
                    tracing::warn!(igw = %igw_id, error = %ec2::error::DisplayErrorContext(err), "detach failed");
                }
                if let Err(err) = self
                    .ec2
                    .delete_internet_gateway()
                    .internet_gateway_id(&igw_id)
                    .send()
                    .await
                {
                    tracing::warn!(igw = %igw_id, error = %ec2::error::DisplayErrorContext(err), "gateway delete failed");
                }
            }
        }

        // Subnets.
        if let Ok(output) = self
            .ec2
            .describe_subnets()
            .filters(Filter::builder().name("vpc-id").values(vpc_id).build())
            .send()
            .await
        {
            for subnet_id in output
                .subnets
                .unwrap_or_default()
                .into_iter()
                .filter_map(|subnet| subnet.subnet_id)
            {
                if let Err(err) = self.ec2.delete_subnet().subnet_id(&subnet_id).send().await {
                    tracing::warn!(subnet = %subnet_id, error = %ec2::error::DisplayErrorContext(err), "subnet delete failed");
                }
            }
        }

        self.ec2
            .delete_vpc()
            .vpc_id(vpc_id)
            .send()
            .await
            .map_err(|err| api_error("DeleteVpc", err.into_service_error()))?;

        Ok(())
    }

    async fn list_security_group_ids(&self, region: &str) -> Result<Vec<String>> {
        let output = self
            .ec2
            .describe_security_groups()
            .set_filters(Some(ephemeral_filters(Some(region))))
            .send()
            .await
            .map_err(|err| api_error("DescribeSecurityGroups", err.into_service_error()))?;

        Ok(output
            .security_groups
            .unwrap_or_default()
            .into_iter()
            .filter_map(|group| group.group_id)
            .collect())
    }

    async fn delete_security_group(&self, group_id: &str) -> Result<()> {
        self.ec2
            .delete_security_group()
            .group_id(group_id)
            .send()
            .await
            .map_err(|err| api_error("DeleteSecurityGroup", err.into_service_error()))?;
        Ok(())
    }
}
