//! Commands that change the workspace: init, validate, plan, apply, destroy, fmt, layout.

use anyhow::{Result, bail};
use std::cell::RefCell;
use terrakit::{PlanState, Step, StepCallback, layout};
use termkit::StageProgress;

use super::{arg_refs, print_json, print_result, with_spinner};
use crate::Context;

pub fn init(ctx: &Context, args: &[String]) -> Result<()> {
    let workspace = ctx.session.open_with_overrides()?;
    let result = with_spinner(ctx, "Initializing...", "Initialized", || {
        workspace.init(&arg_refs(args))
    })?;
    if ctx.verbose > 0 {
        print_result(&result);
    }
    Ok(())
}

pub fn validate(ctx: &Context, json: bool, args: &[String]) -> Result<()> {
    let workspace = ctx.session.open_with_overrides()?;
    if json {
        let view = workspace.validate_json_with(&arg_refs(args))?;
        print_json(&view);
        if view.get_bool("valid") == Some(false) {
            bail!(
                "configuration is invalid ({} errors)",
                view.get_i64("error_count").unwrap_or(0)
            );
        }
        return Ok(());
    }

    let result = workspace.validate(&arg_refs(args))?;
    print_result(&result);
    if !result.success() {
        bail!("configuration is invalid");
    }
    Ok(())
}

pub fn plan(ctx: &Context, save: bool, args: &[String]) -> Result<()> {
    let workspace = ctx.session.open()?;
    let call = &ctx.session.overrides;
    let args = arg_refs(args);
    let result = if save {
        with_spinner(ctx, "Planning...", "Plan saved", || {
            workspace.save_plan(&args, call)
        })?
    } else {
        with_spinner(ctx, "Planning...", "Planned", || workspace.plan(&args, call))?
    };
    print_result(&result);
    if save && !ctx.quiet {
        termkit::dim(&format!(
            "next apply uses {}",
            workspace.plan_artifact().display()
        ));
    }
    Ok(())
}

/// Shows orchestration steps as stages.
struct StageReporter(RefCell<StageProgress>);

impl StepCallback for StageReporter {
    fn on_step(&self, step: Step) {
        self.0.borrow_mut().start(&step.to_string());
    }
}

pub fn apply(ctx: &Context, args: &[String]) -> Result<()> {
    let workspace = ctx.session.open()?;
    let call = &ctx.session.overrides;

    let stages = match workspace.plan_state(call) {
        PlanState::Planned => 1,
        PlanState::NoPlan => 3,
    };
    let progress = if ctx.quiet {
        StageProgress::hidden(stages)
    } else {
        StageProgress::new(stages)
    };

    let reporter = StageReporter(RefCell::new(progress));
    let result = workspace.apply_with_callback(&arg_refs(args), call, &reporter);
    let progress = reporter.0.into_inner();

    match result {
        Ok(result) => {
            progress.finish();
            print_result(&result);
            Ok(())
        }
        Err(e) => {
            progress.fail("failed");
            Err(e.into())
        }
    }
}

pub fn destroy(ctx: &Context, args: &[String]) -> Result<()> {
    let workspace = ctx.session.open()?;
    let call = &ctx.session.overrides;
    let result = with_spinner(ctx, "Destroying...", "Destroyed", || {
        workspace.destroy(&arg_refs(args), call)
    })?;
    print_result(&result);
    Ok(())
}

pub fn fmt(ctx: &Context) -> Result<()> {
    let workspace = ctx.session.open_with_overrides()?;
    let result = workspace.fmt()?;
    if result.stdout.is_empty() {
        if !ctx.quiet {
            termkit::success("Already formatted");
        }
        return Ok(());
    }
    for file in result.stdout.lines() {
        termkit::info(&format!("formatted {file}"));
    }
    Ok(())
}

pub fn layout(ctx: &Context) -> Result<()> {
    // no terraform needed to scaffold
    let written = layout::make_layout(&ctx.session.dir)?;
    if !ctx.quiet {
        for path in &written {
            termkit::success(&format!("wrote {}", path.display()));
        }
    }
    Ok(())
}
