use clap::{Args, ValueEnum};
use society_desk::error::AppError;
use society_desk::tickets::{
    transition_table, ActorIdentity, InMemoryTicketRepository, NewTicket, StatusChangeRequest,
    Ticket, TicketCategory, TicketLifecycleService, TicketPriority, TicketServiceError,
    TicketStatus, TransitionRole, TransitionRow,
};
use std::sync::Arc;

#[derive(Args, Debug, Default)]
pub(crate) struct TransitionArgs {
    /// Only list transitions for one role
    #[arg(long, value_enum)]
    pub(crate) role: Option<RoleArg>,
    /// Emit the table as JSON instead of text
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub(crate) enum RoleArg {
    Reporter,
    Staff,
}

impl From<RoleArg> for TransitionRole {
    fn from(value: RoleArg) -> Self {
        match value {
            RoleArg::Reporter => TransitionRole::Reporter,
            RoleArg::Staff => TransitionRole::Staff,
        }
    }
}

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Society identifier stamped on the sample ticket
    #[arg(long, default_value = "S1")]
    pub(crate) society: String,
    /// Flat number of the reporting resident
    #[arg(long, default_value = "A-101")]
    pub(crate) flat: String,
    /// Have the resident reopen the completed ticket once before accepting it
    #[arg(long)]
    pub(crate) reopen: bool,
    /// Print the final ticket document as JSON
    #[arg(long)]
    pub(crate) json: bool,
}

impl Default for DemoArgs {
    fn default() -> Self {
        Self {
            society: "S1".to_string(),
            flat: "A-101".to_string(),
            reopen: false,
            json: false,
        }
    }
}

pub(crate) fn run_transition_listing(args: TransitionArgs) -> Result<(), AppError> {
    let rows = filter_rows(transition_table(), args.role.map(TransitionRole::from));

    if args.json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    for line in render_rows(&rows) {
        println!("{line}");
    }
    Ok(())
}

fn filter_rows(rows: Vec<TransitionRow>, role: Option<TransitionRole>) -> Vec<TransitionRow> {
    rows.into_iter()
        .filter(|row| role.map_or(true, |role| row.role == role))
        .collect()
}

fn render_rows(rows: &[TransitionRow]) -> Vec<String> {
    rows.iter()
        .map(|row| {
            let targets = if row.allowed.is_empty() {
                "(none)".to_string()
            } else {
                row.allowed
                    .iter()
                    .map(|status| status.label())
                    .collect::<Vec<_>>()
                    .join(", ")
            };
            format!("{:<9} {:<11} -> {}", row.role, row.current, targets)
        })
        .collect()
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let repository = Arc::new(InMemoryTicketRepository::default());
    let service = TicketLifecycleService::new(repository);
    let resident = ActorIdentity::resident("R1", "Asha Rao").with_flat_number(args.flat.clone());
    let manager = ActorIdentity::staff("M1", "Meera Iyer").with_designation("Facility Manager");

    println!("Maintenance ticket lifecycle demo");
    let ticket = service.create(NewTicket {
        title: "Leaking kitchen tap".to_string(),
        description: "Tap drips constantly and the cabinet below is getting damp".to_string(),
        category: Some(TicketCategory::Plumbing),
        priority: Some(TicketPriority::High),
        flat_number: args.flat.clone(),
        society_id: args.society.clone(),
        reporter_id: resident.id.clone(),
        images: vec!["https://cdn.example/tickets/tap.jpg".to_string()],
    })?;
    println!(
        "- {} reported {} in flat {} -> {}",
        resident.name,
        ticket.id,
        ticket.flat_number,
        ticket.status()
    );

    let mut steps = vec![
        (
            TransitionRole::Staff,
            StatusChangeRequest::to(TicketStatus::Approved),
        ),
        (
            TransitionRole::Staff,
            StatusChangeRequest::to(TicketStatus::Assigned)
                .with_assignee("plumber-07")
                .with_reason("Plumber booked for tomorrow morning"),
        ),
        (
            TransitionRole::Staff,
            StatusChangeRequest::to(TicketStatus::InProgress),
        ),
        (
            TransitionRole::Staff,
            StatusChangeRequest::to(TicketStatus::Completed),
        ),
    ];
    if args.reopen {
        steps.push((
            TransitionRole::Reporter,
            StatusChangeRequest::to(TicketStatus::Pending).with_reason("Still dripping at night"),
        ));
        steps.push((
            TransitionRole::Staff,
            StatusChangeRequest::to(TicketStatus::Assigned).with_assignee("plumber-07"),
        ));
        steps.push((
            TransitionRole::Staff,
            StatusChangeRequest::to(TicketStatus::Completed),
        ));
    }
    steps.push((
        TransitionRole::Reporter,
        StatusChangeRequest::to(TicketStatus::Resolved).with_reason("Fixed, thank you"),
    ));

    let mut current = ticket;
    for (role, request) in steps {
        let actor = match role {
            TransitionRole::Reporter => &resident,
            TransitionRole::Staff => &manager,
        };
        current = apply_step(&service, &current, role, actor, request)?;
    }

    service.add_comment(
        &current.id,
        &manager,
        "Closing the loop: washer replaced",
        Vec::new(),
    )?;

    match service.delete(&current.id) {
        Err(TicketServiceError::DeletionNotAllowed { status, .. }) => {
            println!("- Delete attempt refused while {status}, history preserved")
        }
        Err(err) => return Err(err.into()),
        Ok(()) => println!("- Ticket {} deleted", current.id),
    }

    let final_ticket = service.get(&current.id)?;
    println!(
        "Audit trail ({} entries), comment thread ({} entries)",
        final_ticket.status_history().len(),
        final_ticket.comments().len()
    );
    for change in final_ticket.status_history() {
        match &change.reason {
            Some(reason) => println!("  - {} by {} ({reason})", change.status, change.changed_by),
            None => println!("  - {} by {}", change.status, change.changed_by),
        }
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&final_ticket)?);
    }

    Ok(())
}

fn apply_step(
    service: &TicketLifecycleService<InMemoryTicketRepository>,
    ticket: &Ticket,
    role: TransitionRole,
    actor: &ActorIdentity,
    request: StatusChangeRequest,
) -> Result<Ticket, TicketServiceError> {
    let from = ticket.status();
    let updated = service.change_status(&ticket.id, role, actor, request)?;
    println!(
        "- {} ({role}) moved {} {} -> {}",
        actor.name,
        ticket.id,
        from,
        updated.status()
    );
    Ok(updated)
}
